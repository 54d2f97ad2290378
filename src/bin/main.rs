// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use credit_orders::config::ConfigError;
use credit_orders::{
    BusinessId, CustomerId, Gateway, LineItem, MemoryStore, OrderProcessor, ProductId,
    PurchaseRequest, Seed, ServiceError, StoreConfig, overdue_report,
};
use csv::{ReaderBuilder, Trim, Writer};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Credit Orders - Place purchase orders against credit-limited customers
///
/// Loads customers, products and ledger history from a JSON seed file, then
/// either places the purchases listed in a CSV file or prints the overdue
/// credit report for one business.
#[derive(Parser, Debug)]
#[command(name = "credit-orders")]
#[command(about = "Places credit purchase orders from CSV and reports overdue balances", long_about = None)]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct StoreArgs {
    /// JSON file with store settings; flags below override it
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Connection pool size
    #[arg(long, global = true)]
    max_connections: Option<usize>,

    /// Milliseconds to wait for a contended row lock
    #[arg(long, global = true)]
    lock_timeout_ms: Option<u64>,

    /// Milliseconds to wait for a free pooled connection
    #[arg(long, global = true)]
    acquire_timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place the purchases listed in a CSV file
    ///
    /// Expected format: request,business,customer,product,quantity
    /// Consecutive rows sharing a request id form one purchase.
    Purchase {
        /// JSON seed file with customers, products and ledger entries
        #[arg(long, value_name = "FILE")]
        seed: PathBuf,

        /// Path to CSV file with purchase lines
        #[arg(value_name = "FILE")]
        orders: PathBuf,
    },
    /// Print the overdue credit report of a business as JSON
    Overdue {
        #[arg(long, value_name = "FILE")]
        seed: PathBuf,

        #[arg(long)]
        business: u32,

        /// Report date (RFC 3339), defaults to now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let config = match store_config(&args.store) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    match args.command {
        Command::Purchase { seed, orders } => {
            let store = open_store(&config, &seed);
            let file = match fs::File::open(&orders) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Error opening file '{}': {}", orders.display(), e);
                    process::exit(1);
                }
            };
            let processor = OrderProcessor::new(store);
            if let Err(e) =
                process_purchases(&processor, BufReader::new(file), std::io::stdout())
            {
                eprintln!("Error processing purchases: {}", e);
                process::exit(1);
            }
        }
        Command::Overdue {
            seed,
            business,
            as_of,
        } => {
            let store = open_store(&config, &seed);
            let as_of = as_of.unwrap_or_else(Utc::now);
            let report = match overdue_report(&store, BusinessId(business), as_of) {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("Error building report: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = serde_json::to_writer_pretty(std::io::stdout(), &report) {
                eprintln!("Error writing output: {}", e);
                process::exit(1);
            }
            println!();
        }
    }
}

/// Logs go to stderr so CSV and JSON output stay clean.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CREDIT_ORDERS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn store_config(args: &StoreArgs) -> Result<StoreConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(max_connections) = args.max_connections {
        config.max_connections = max_connections;
    }
    if let Some(lock_timeout_ms) = args.lock_timeout_ms {
        config.lock_timeout_ms = lock_timeout_ms;
    }
    if let Some(acquire_timeout_ms) = args.acquire_timeout_ms {
        config.acquire_timeout_ms = acquire_timeout_ms;
    }
    config.validate()
}

fn open_store(config: &StoreConfig, seed_path: &Path) -> MemoryStore {
    let seed = match fs::read_to_string(seed_path)
        .map_err(|e| e.to_string())
        .and_then(|json| Seed::from_json_str(&json).map_err(|e| e.to_string()))
    {
        Ok(seed) => seed,
        Err(e) => {
            eprintln!("Error reading seed '{}': {}", seed_path.display(), e);
            process::exit(1);
        }
    };
    let store = MemoryStore::new(config);
    if let Err(e) = store.load_seed(seed) {
        eprintln!("Error loading seed '{}': {}", seed_path.display(), e);
        process::exit(1);
    }
    store
}

/// One purchase line. The `request` column is read separately to group lines.
///
/// Fields: `business, customer, product, quantity`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    business: u32,
    customer: u32,
    product: u32,
    quantity: i64,
}

/// One output row per purchase request.
#[derive(Debug, Serialize)]
struct CsvOutcome {
    request: String,
    status: String,
    order: Option<u64>,
    error: Option<String>,
}

/// A request id with its purchase, or the reason its rows were rejected.
type CsvRequest = (String, Result<PurchaseRequest, ServiceError>);

/// Groups consecutive CSV lines into purchase requests.
///
/// A request is all or nothing: if any of its lines fails to parse, lacks a
/// request id, or names a different business or customer than its first
/// line, the whole request becomes an [`ServiceError::InvalidRequest`].
///
/// # Errors
///
/// Returns a CSV error only if the input cannot be read at all.
fn read_requests<R: Read>(reader: R) -> Result<Vec<CsvRequest>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.byte_headers()?.clone();

    let mut requests: Vec<CsvRequest> = Vec::new();
    for row in rdr.byte_records() {
        let row = row?;
        let line = row.position().map_or(0, |pos| pos.line());
        let request_id = row
            .get(0)
            .map(|id| String::from_utf8_lossy(id).into_owned())
            .unwrap_or_default();
        let record = if request_id.is_empty() {
            Err(invalid_row(line, "missing request id"))
        } else {
            row.deserialize::<CsvRecord>(Some(&headers))
                .map_err(|e| invalid_row(line, e))
        };

        match requests.last_mut() {
            Some((id, pending)) if *id == request_id => {
                let Ok(request) = &mut *pending else {
                    continue;
                };
                let item = record.and_then(|record| {
                    if BusinessId(record.business) != request.business_id
                        || CustomerId(record.customer) != request.customer_id
                    {
                        return Err(invalid_row(
                            line,
                            "business or customer differs from the request's first line",
                        ));
                    }
                    Ok(LineItem {
                        product_id: ProductId(record.product),
                        quantity: record.quantity,
                    })
                });
                match item {
                    Ok(item) => request.items.push(item),
                    Err(e) => {
                        debug!(request = %request_id, error = %e, "bad row rejects request");
                        *pending = Err(e);
                    }
                }
            }
            _ => requests.push((
                request_id,
                record.map(|record| {
                    PurchaseRequest::new(BusinessId(record.business), CustomerId(record.customer))
                        .item(ProductId(record.product), record.quantity)
                }),
            )),
        }
    }
    Ok(requests)
}

fn invalid_row(line: u64, reason: impl Display) -> ServiceError {
    ServiceError::InvalidRequest(format!("line {line}: {reason}"))
}

/// Places every purchase in the CSV and writes one outcome row per request.
///
/// # CSV Format
///
/// Input columns: `request, business, customer, product, quantity`
///
/// ```csv
/// request,business,customer,product,quantity
/// r1,1,1,10,3
/// r1,1,1,11,1
/// r2,1,2,10,1
/// ```
///
/// Output columns: `request, status, order, error`
///
/// ```csv
/// request,status,order,error
/// r1,ok,1,
/// r2,INSUFFICIENT_STOCK,,"insufficient stock for product 10: requested 1, available 0"
/// ```
///
/// # Errors
///
/// Returns a CSV error if reading or writing fails. Rejected purchases are
/// reported in the output, not as errors.
fn process_purchases<G, R, W>(
    processor: &OrderProcessor<G>,
    reader: R,
    writer: W,
) -> Result<(), csv::Error>
where
    G: Gateway,
    R: Read,
    W: Write,
{
    let mut wtr = Writer::from_writer(writer);

    for (request_id, request) in read_requests(reader)? {
        let outcome = match request.and_then(|request| processor.place_order(&request)) {
            Ok(order_id) => CsvOutcome {
                request: request_id,
                status: "ok".to_string(),
                order: Some(order_id.0),
                error: None,
            },
            Err(e) => {
                warn!(request = %request_id, error = %e, "purchase rejected");
                CsvOutcome {
                    request: request_id,
                    status: e.kind().code().to_string(),
                    order: None,
                    error: Some(e.to_string()),
                }
            }
        };
        wtr.serialize(outcome)?;
    }

    wtr.flush()?;
    Ok(())
}
