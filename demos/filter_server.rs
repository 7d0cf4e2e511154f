//! Filtered listing server example
//!
//! Serves the default configuration (`tasks` and `keywords`) from an
//! in-memory record store:
//! - GET   /{entity} with filter query parameters
//! - PATCH /{entity}/{record_id} to update a record (drops cached listings)
//!
//! Pass a YAML file as first argument to use your own entities.

use anyhow::Result;
use filters::prelude::*;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filters=debug,tower_http=info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => FiltersConfig::from_yaml_file(&path)?,
        None => FiltersConfig::default_config(),
    };

    let store = InMemoryRecordStore::new();
    populate_test_data(&store)?;

    let service = FilterService::new(Arc::new(store), &config)?;
    println!("📦 Entities: {:?}", service.entity_names());

    let app = build_filter_routes(AppState::new(service)).layer(TraceLayer::new_for_http());

    // Start the server
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    println!("🌐 Server starting on http://{}\n", addr);

    println!("💡 Example requests:");
    println!("   curl 'http://localhost:3000/tasks?status=active%2Ctodo&sortBy=name&sortOrder=desc'");
    println!("   curl 'http://localhost:3000/keywords?search=shoes&volumeMin=500&limit=5'");
    println!("   curl -X PATCH -H 'content-type: application/json' \\");
    println!("        -d '{{\"Status\":\"done\"}}' http://localhost:3000/tasks/rec1");
    println!("   curl http://localhost:3000/_cache/stats");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("✅ Server is ready! Press Ctrl+C to stop.\n");

    axum::serve(listener, app).await?;

    Ok(())
}

fn populate_test_data(store: &InMemoryRecordStore) -> Result<()> {
    store.insert_all(
        "Tasks",
        vec![
            Record::new(
                "rec1",
                json!({ "Name": "Technical SEO audit", "Status": "active", "Date": "2024-02-12", "Assignee": ["usr1"], "Client": ["Acme"], "Estimate (h)": 12 }),
            ),
            Record::new(
                "rec2",
                json!({ "Name": "Backlink outreach", "Status": "todo", "Date": "2024-04-03", "Assignee": ["usr2"], "Client": ["Globex"], "Estimate (h)": 6 }),
            ),
            Record::new(
                "rec3",
                json!({ "Name": "Monthly report", "Status": "done", "Date": "2024-05-31", "Assignee": ["usr1", "usr2"], "Client": ["Acme", "Globex"], "Estimate (h)": 3 }),
            ),
        ],
    )?;

    store.insert_all(
        "Keywords",
        vec![
            Record::new("kw1", json!({ "Keyword": "running shoes", "Search Volume": 12000 })),
            Record::new("kw2", json!({ "Keyword": "trail running shoes", "Search Volume": 2400 })),
            Record::new("kw3", json!({ "Keyword": "shoe repair near me", "Search Volume": 880 })),
            Record::new("kw4", json!({ "Keyword": "sandals", "Search Volume": 5400 })),
        ],
    )?;

    Ok(())
}
