//! Sealink handshake demo
//!
//! Runs two peers in one process, passing encoded packets through an
//! in-memory queue in place of a network transport.
//!
//! Usage: `handshake-demo [config.json]`

use std::collections::VecDeque;

use anyhow::{Context, bail};
use bytes::Bytes;
use crypto_session::{Session, to_hex, verify_identity};
use shared_protocol::{Packet, PeerId, SessionConfig};
use tracing::{info, warn};

/// A named endpoint with an inbox of raw packets
struct Peer {
    name: &'static str,
    id: PeerId,
    session: Session,
    inbox: VecDeque<Bytes>,
}

impl Peer {
    fn new(name: &'static str, config: SessionConfig) -> Self {
        let session = Session::new(config);
        session.initialize();
        Self {
            name,
            id: PeerId::new(),
            session,
            inbox: VecDeque::new(),
        }
    }

    fn recv(&mut self) -> anyhow::Result<Packet> {
        let bytes = self.inbox.pop_front().context("inbox empty")?;
        Ok(Packet::from_bytes(&bytes)?)
    }
}

fn send(to: &mut Peer, packet: &Packet) -> anyhow::Result<()> {
    let bytes = packet.to_bytes()?;
    info!(to = to.name, kind = ?packet.packet_type(), len = bytes.len(), "packet sent");
    to.inbox.push_back(bytes);
    Ok(())
}

/// Receive the other side's identity and complete our half of the handshake
fn accept_identity(me: &mut Peer, from: PeerId) -> anyhow::Result<()> {
    let Packet::Identity(identity) = me.recv()? else {
        bail!("{} expected an identity packet", me.name);
    };
    if !verify_identity(&identity) {
        warn!(peer = me.name, "identity signature invalid, aborting");
        bail!("handshake aborted by {}", me.name);
    }
    me.session.establish(from, &identity)?;
    info!(peer = me.name, from = %from, "identity verified, secret established");
    Ok(())
}

fn load_config() -> anyhow::Result<SessionConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            Ok(SessionConfig::from_json(&json)?)
        }
        None => Ok(SessionConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("handshake_demo=info".parse()?)
                .add_directive("crypto_session=debug".parse()?),
        )
        .init();

    let config = load_config()?;
    info!(?config, "Starting Sealink handshake demo");

    let mut alice = Peer::new("alice", config.clone());
    let mut bob = Peer::new("bob", config);

    let alice_identity = Packet::Identity(alice.session.export_public_identity()?);
    let bob_identity = Packet::Identity(bob.session.export_public_identity()?);
    send(&mut bob, &alice_identity)?;
    send(&mut alice, &bob_identity)?;

    let (alice_id, bob_id) = (alice.id, bob.id);
    accept_identity(&mut alice, bob_id)?;
    accept_identity(&mut bob, alice_id)?;

    let sealed = alice.session.peer_cipher(&bob_id)?.encrypt_authenticated(b"hello")?;
    info!(nonce = %to_hex(&sealed.nonce), ciphertext = %to_hex(&sealed.ciphertext), "alice sealed message");
    send(&mut bob, &Packet::Sealed(sealed))?;

    let Packet::Sealed(envelope) = bob.recv()? else {
        bail!("bob expected a sealed packet");
    };
    let text = bob
        .session
        .peer_cipher(&alice_id)?
        .decrypt_authenticated_text(&envelope.ciphertext, &envelope.nonce)?;
    info!(%text, "bob opened message");

    if bob.session.config().allow_fixed_nonce {
        let cipher = bob.session.peer_cipher(&alice_id)?;
        let reply = cipher.encrypt_stream_fixed_nonce(b"ack")?;
        send(&mut alice, &Packet::FixedStream(reply))?;

        let Packet::FixedStream(ciphertext) = alice.recv()? else {
            bail!("alice expected a fixed-nonce packet");
        };
        let ack = alice
            .session
            .peer_cipher(&bob_id)?
            .decrypt_stream_fixed_nonce(&ciphertext)?;
        info!(ack = %String::from_utf8_lossy(&ack), "alice received fixed-nonce reply");
    }

    Ok(())
}
