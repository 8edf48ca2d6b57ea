//! Waymark - operator CLI for actors' offered navigation

use bson::oid::ObjectId;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waymark::{
    config::{Args, Command},
    db::{MongoClient, MongoRecordStore},
    nav::{Link, NavServices, NavigationEngine},
    NavError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("waymark={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    if args.dev_mode {
        warn!("Development mode: link targets are not validated");
    }

    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    let store = MongoRecordStore::new(client).await?;
    let services = NavServices::shared(Arc::new(store.unit_of_work()))
        .with_validator(args.path_validator())
        .with_audit(args.audit_sink()?)
        .with_redirect(args.redirect_settings());

    match &args.command {
        Command::Show { actor } => {
            let actor = load_actor(&services, actor).await?;
            let view = serde_json::json!({
                "actor": actor.name,
                "allowed_navs": actor.allowed_navs,
                "allowed_navs_cache": actor.allowed_navs_cache,
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Clear { actor } => {
            let id = parse_actor_id(actor)?;
            if store.clear_navigation(&id).await? {
                info!("Cleared navigation for {}", id);
            } else {
                return Err(NavError::NotFound(format!("actor {}", id)).into());
            }
        }
        Command::Check {
            actor,
            url,
            consume,
        } => {
            let mut actor = load_actor(&services, actor).await?;
            let mut engine = NavigationEngine::new(&services, Some(&mut actor));
            engine.load_state();

            let authorized = engine.check_request_url(Some(url.as_str()), !consume).await;
            match &authorized {
                Some(url) => println!("authorized: {}", url),
                None => println!("not offered: {}", url),
            }

            if *consume && authorized.is_some() {
                engine.finish().await?;
            }
        }
        Command::Offer {
            actor,
            name,
            url,
            container,
        } => {
            let mut actor = load_actor(&services, actor).await?;
            let mut engine = NavigationEngine::new(&services, Some(&mut actor));
            engine.load_state();

            let outcome = engine.add(Link::named(name, url).with_container(container.as_str()), None);
            println!("{:?}", outcome);

            if outcome.is_accepted() {
                engine.finish().await?;
            }
        }
    }

    Ok(())
}

fn parse_actor_id(raw: &str) -> Result<ObjectId, NavError> {
    ObjectId::parse_str(raw).map_err(|e| NavError::Config(format!("Invalid actor id '{}': {}", raw, e)))
}

async fn load_actor(services: &NavServices, raw: &str) -> Result<waymark::db::ActorDoc, NavError> {
    let id = parse_actor_id(raw)?;
    services
        .store
        .find_actor(&id)
        .await?
        .ok_or_else(|| NavError::NotFound(format!("actor {}", id)))
}
