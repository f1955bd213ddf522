use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use invoice_ledger::api::{self, AppState};
use invoice_ledger::db::{self, queries, schema};
use invoice_ledger::service::{render_markdown, report::DEFAULT_MAX_ROWS};
use invoice_ledger::{create_pool, AppConfig, IngestService, LedgerError};
use sqlx::PgPool;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "invoice-ledger", version, about = "客户 / 发票 / 发票明细 存储工具")]
struct Cli {
    /// 配置文件路径 (默认读取当前目录的 ledger.toml)
    #[arg(long, global = true, env = "LEDGER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 表结构: 打印 / 删表重建 / 校验
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// 从目录导入 Clients.csv / Invoices.csv / InvoiceLineItems.csv
    Ingest {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// 导入前删表重建
        #[arg(long)]
        reset: bool,
    },
    /// 三张表的行数
    Stats,
    /// 查询并以 markdown 表格输出
    Query {
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: usize,
        #[command(subcommand)]
        query: QueryCommand,
    },
    /// 启动只读 HTTP 服务
    Serve,
}

#[derive(Debug, Subcommand)]
enum SchemaAction {
    Print,
    Apply,
    Verify,
}

#[derive(Debug, Subcommand)]
enum QueryCommand {
    Clients {
        #[arg(long)]
        country: Option<String>,
    },
    Invoices {
        #[arg(long)]
        client: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Status {
        #[arg(long)]
        status: String,
    },
    Overdue {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    LineItems {
        #[arg(long)]
        invoice: String,
    },
    Service {
        #[arg(long)]
        name: String,
    },
    ServiceTotals,
    /// 某月开票的发票
    Month {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// 某年度按客户汇总含税金额
    ClientTotals {
        #[arg(long)]
        year: i32,
    },
    /// 某年度含税金额最高的客户
    TopClient {
        #[arg(long)]
        year: i32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式，RUST_LOG 控制级别
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    // 打印脚本不需要配置和数据库
    if let Command::Schema {
        action: SchemaAction::Print,
    } = &cli.command
    {
        print!("{}", schema::render_script());
        return Ok(());
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    info!("Loaded config: server={:?}, search_path={:?}", config.server, config.database.search_path);

    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    match cli.command {
        Command::Schema { action } => run_schema(&pool, action).await?,
        Command::Ingest { dir, reset } => {
            let dir = dir.unwrap_or_else(|| config.ingest.data_dir.clone());
            let summary = IngestService::new(pool.clone()).ingest_dir(&dir, reset).await?;
            println!(
                "Inserted: clients={}, invoices={}, items={}",
                summary.clients, summary.invoices, summary.line_items
            );
        }
        Command::Stats => {
            let counts = queries::table_counts(&pool).await?;
            println!("{}", render_markdown(&[counts], 1));
        }
        Command::Query { max_rows, query } => run_query(&pool, query, max_rows).await?,
        Command::Serve => serve(&config, pool).await?,
    }

    Ok(())
}

async fn run_schema(pool: &PgPool, action: SchemaAction) -> Result<(), LedgerError> {
    match action {
        SchemaAction::Print => print!("{}", schema::render_script()),
        SchemaAction::Apply => {
            db::apply_schema(pool).await?;
            println!("Schema applied");
        }
        SchemaAction::Verify => {
            let report = db::describe_schema(pool).await?;
            println!("tables:  {}", report.tables.join(", "));
            println!("indexes: {}", report.indexes.join(", "));
            if !report.is_complete() {
                return Err(LedgerError::NotFound(format!(
                    "missing tables {:?}, missing indexes {:?}",
                    report.missing_tables(),
                    report.missing_indexes()
                )));
            }
            println!("Schema complete");
        }
    }
    Ok(())
}

async fn run_query(pool: &PgPool, query: QueryCommand, max_rows: usize) -> Result<(), LedgerError> {
    let table = match query {
        QueryCommand::Clients { country } => {
            let clients = match country {
                Some(country) => queries::clients_by_country(pool, &country).await?,
                None => queries::list_clients(pool).await?,
            };
            render_markdown(&clients, max_rows)
        }
        QueryCommand::Invoices { client, from, to } => {
            let range = invoice_ledger::models::DateRange { from, to };
            render_markdown(&queries::invoices_for_client(pool, &client, range).await?, max_rows)
        }
        QueryCommand::Status { status } => {
            render_markdown(&queries::invoices_by_status(pool, &status).await?, max_rows)
        }
        QueryCommand::Overdue { as_of } => {
            let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
            render_markdown(&queries::overdue_invoices(pool, as_of).await?, max_rows)
        }
        QueryCommand::LineItems { invoice } => {
            render_markdown(&queries::line_items_for_invoice(pool, &invoice).await?, max_rows)
        }
        QueryCommand::Service { name } => {
            render_markdown(&queries::line_items_by_service(pool, &name).await?, max_rows)
        }
        QueryCommand::ServiceTotals => {
            render_markdown(&queries::service_totals(pool).await?, max_rows)
        }
        QueryCommand::Month { year, month } => {
            render_markdown(&queries::invoices_for_month(pool, year, month).await?, max_rows)
        }
        QueryCommand::ClientTotals { year } => {
            render_markdown(&queries::client_totals_for_year(pool, year).await?, max_rows)
        }
        QueryCommand::TopClient { year } => match queries::top_client_for_year(pool, year).await? {
            Some(top) => render_markdown(&[top], 1),
            None => format!("No priced line items in {}", year),
        },
    };
    println!("{}", table);
    Ok(())
}

async fn serve(config: &AppConfig, pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
    db::ping(&pool).await?;
    let app = api::build_router(AppState { pool });

    let addr = config.listen_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET /api/clients?country=  |  /api/clients/totals?year=  |  /api/clients/top?year=");
    info!("  GET /api/clients/:client_id/invoices?from=&to=");
    info!("  GET /api/invoices?status=  |  /api/invoices/overdue?as_of=  |  /api/invoices/by-month?year=&month=");
    info!("  GET /api/invoices/:invoice_id/line-items");
    info!("  GET /api/services/:service_name/line-items  |  /api/services/totals");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
