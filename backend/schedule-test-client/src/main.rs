// src/main.rs

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    data_loaded: bool,
}

#[derive(Debug, Deserialize)]
struct ScheduleTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    detail: String,
    code: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;

    println!("Health check response: {:?}", health_response);

    // Test 2: Schedule table
    println!("\n🔍 Testing schedule table endpoint...");
    let table_response = client
        .get(format!("{}/api/schedule-table", base_url))
        .send()
        .await?;

    println!("Schedule table status: {}", table_response.status());

    if table_response.status().is_success() {
        let table = table_response.json::<ScheduleTable>().await?;
        print_table(&table);
    } else {
        let error = table_response.json::<ErrorResponse>().await?;
        println!(
            "Schedule table failed [{}]: {} ({})",
            error.code, error.error, error.detail
        );
    }

    // Test 3: CSV export
    println!("\n🔍 Testing CSV export endpoint...");
    let csv_response = client
        .get(format!("{}/api/schedule-table/csv", base_url))
        .send()
        .await?;

    println!("CSV export status: {}", csv_response.status());
    println!("{}", csv_response.text().await?);

    // Test 4: Cache refresh
    println!("\n🔍 Testing cache refresh endpoint...");
    let refresh_response = client
        .post(format!("{}/api/schedule-table/refresh", base_url))
        .send()
        .await?;

    println!("Refresh status: {}", refresh_response.status());
    println!("Refresh body: {}", refresh_response.text().await?);

    println!("\n✅ Testing complete!");

    Ok(())
}

fn print_table(table: &ScheduleTable) {
    if table.rows.is_empty() {
        println!("No assignments found.");
        return;
    }

    println!("{}", table.columns.join(" | "));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}
