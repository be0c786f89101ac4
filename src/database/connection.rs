use mongodb::{Client, Database};
use std::env;

pub async fn get_db_client() -> Database {
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set as an environment variable");

    let client = Client::with_uri_str(&database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db_name = "shambadb";
    let db = client.database(db_name);

    // Verify database exists by listing collections
    match db.list_collection_names(None).await {
        Ok(collections) => {
            println!("✅ Connected to database: {}", db_name);
            println!("📂 Collections found: {:?}", collections);

            if !collections.contains(&"payments".to_string()) {
                println!("⚠️ Warning: 'payments' collection not found in database");
            }
        }
        Err(e) => {
            eprintln!("❌ Database '{}' may not exist or is inaccessible: {}", db_name, e);
        }
    }

    db
}
