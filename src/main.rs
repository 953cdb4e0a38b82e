//! Keyrace Session Server
//!
//! Demo entrypoint: builds the in-memory stack and runs one full session
//! lifecycle, including a deliberate race of simultaneous victory claims.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keyrace::{
    Address, AuthConfig, ChannelBroadcaster, GameKey, HiddenAdjust, MemoryStore, TokenIssuer,
    TransitionEngine, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Keyrace Session Engine v{}", VERSION);

    let auth = AuthConfig::from_env()
        .unwrap_or_else(|| AuthConfig::new("development-only-secret"));
    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let engine = Arc::new(TransitionEngine::new(
        Arc::new(MemoryStore::new()),
        broadcaster.clone(),
        Arc::new(TokenIssuer::new(auth)),
    ));

    demo_session(engine, broadcaster).await
}

/// Run a demo session: create, join, adjust, then race the victory claim.
async fn demo_session(
    engine: Arc<TransitionEngine<MemoryStore, ChannelBroadcaster>>,
    broadcaster: Arc<ChannelBroadcaster>,
) -> Result<()> {
    let admin = Address::from("0xadmin");
    let created = engine
        .create_game(admin, "deadbeefcafef00d", 4)
        .await?;
    let game_id = created.snapshot.id;
    info!(invite = %created.snapshot.invite_code, "session open");

    let mut updates = broadcaster.subscribe(game_id);

    let mut credentials = Vec::new();
    for player in ["0xaaa", "0xbbb", "0xccc"] {
        let joined = engine
            .join(GameKey::Id(game_id), Address::from(player))
            .await?;
        credentials.push(joined.credential);
    }

    // Admin reveals two characters.
    for _ in 0..2 {
        engine
            .adjust_hidden(
                GameKey::Id(game_id),
                &created.credential,
                HiddenAdjust::Decrease,
            )
            .await?;
    }

    // All three players claim victory in the same instant.
    let mut claims = Vec::new();
    for credential in credentials {
        let engine = engine.clone();
        claims.push(tokio::spawn(async move {
            engine.end_game(GameKey::Id(game_id), &credential).await
        }));
    }

    let mut wins = 0;
    for claim in claims {
        match claim.await? {
            Ok(snapshot) => {
                wins += 1;
                info!(winner = ?snapshot.winner, "claim succeeded");
            }
            Err(err) => info!("claim rejected: {err}"),
        }
    }
    info!(wins, "race resolved to a single winner");

    // Drain the realtime channel to show what observers saw.
    while let Ok(event) = updates.try_recv() {
        info!(
            version = event.snapshot.version,
            status = %event.snapshot.status,
            mask = %event.snapshot.reveal_mask,
            "observer update"
        );
    }

    Ok(())
}
