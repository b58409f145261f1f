use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use lessonbook::application::catalog::Catalog;
use lessonbook::application::lifecycle::{LessonPorts, LessonService};
use lessonbook::application::payments::PaymentGateway;
use lessonbook::application::payout::PayoutGate;
use lessonbook::application::scheduler::Scheduler;
use lessonbook::domain::catalog::{SortKey, TeacherQuery};
use lessonbook::domain::ports::PayoutStoreBox;
use lessonbook::domain::pricing::PricingPolicy;
use lessonbook::infrastructure::in_memory::{
    InMemoryLedger, InMemoryLessonStore, InMemoryPayoutStore, InMemoryTaskStore,
    InMemoryTeacherAccounts, InMemoryTeacherDirectory, LogNotifier, SimulatedPaymentMethod,
};
use lessonbook::interfaces::csv::command_reader::{Command, CommandReader};
use lessonbook::interfaces::csv::report_writer::ReportWriter;
use lessonbook::interfaces::csv::teacher_reader::TeacherReader;
use lessonbook::logging;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Student payment methods accepted by the simulated gateway.
const SIMULATED_METHODS: [&str; 3] = ["card", "paypal", "wallet"];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV stream of lesson commands and print a report
    Process(ProcessArgs),
    /// Search a teacher CSV the way the public catalog does
    Search(SearchArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Report {
    Lessons,
    Balances,
    Payouts,
}

#[derive(Parser)]
struct ProcessArgs {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Platform commission as a fraction of the base price
    #[arg(long, env = "LESSONBOOK_COMMISSION_RATE", default_value = "0.20")]
    commission_rate: Decimal,

    /// Tax as a fraction of price plus commission
    #[arg(long, env = "LESSONBOOK_TAX_RATE", default_value = "0.07")]
    tax_rate: Decimal,

    /// Run scheduled tasks up to this instant after the last command
    #[arg(long)]
    until: Option<DateTime<Utc>>,

    #[arg(long, value_enum, default_value = "lessons")]
    report: Report,
}

#[derive(Parser)]
struct SearchArgs {
    /// Teacher profiles CSV file
    teachers: PathBuf,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    min_price: Option<Decimal>,
    #[arg(long)]
    max_price: Option<Decimal>,
    #[arg(long)]
    min_rating: Option<f64>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// rating, price-low, price-high, reviews or experience
    #[arg(long, default_value = "rating")]
    sort: SortKey,
    #[arg(long)]
    page: Option<usize>,
    #[arg(long)]
    limit: Option<usize>,
}

struct Engine {
    lessons: Arc<LessonService>,
    payouts: PayoutGate,
}

fn payment_gateway() -> PaymentGateway {
    SIMULATED_METHODS
        .into_iter()
        .fold(PaymentGateway::new(), |gateway, method| {
            gateway.with(Box::new(SimulatedPaymentMethod::approving(method)))
        })
}

#[cfg(feature = "storage-rocksdb")]
fn build_engine(pricing: PricingPolicy, db_path: Option<PathBuf>) -> Result<Engine> {
    use lessonbook::infrastructure::rocksdb::RocksDBStore;

    let Some(db_path) = db_path else {
        return Ok(in_memory_engine(pricing));
    };
    let store = RocksDBStore::open(db_path).into_diagnostic()?;
    let lessons = LessonService::new(
        pricing,
        LessonPorts {
            lessons: Box::new(store.clone()),
            tasks: Box::new(store.clone()),
            teachers: Box::new(store.clone()),
            ledger: Box::new(store.clone()),
            notifier: Box::new(LogNotifier),
            payments: payment_gateway(),
        },
    );
    let payouts: PayoutStoreBox = Box::new(store);
    Ok(Engine {
        lessons: Arc::new(lessons),
        payouts: PayoutGate::new(payouts),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_engine(pricing: PricingPolicy, db_path: Option<PathBuf>) -> Result<Engine> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_engine(pricing))
}

fn in_memory_engine(pricing: PricingPolicy) -> Engine {
    let lessons = LessonService::new(
        pricing,
        LessonPorts {
            lessons: Box::new(InMemoryLessonStore::new()),
            tasks: Box::new(InMemoryTaskStore::new()),
            teachers: Box::new(InMemoryTeacherAccounts::new()),
            ledger: Box::new(InMemoryLedger::new()),
            notifier: Box::new(LogNotifier),
            payments: payment_gateway(),
        },
    );
    let payouts: PayoutStoreBox = Box::new(InMemoryPayoutStore::new());
    Engine {
        lessons: Arc::new(lessons),
        payouts: PayoutGate::new(payouts),
    }
}

async fn apply(engine: &Engine, command: Command, at: DateTime<Utc>) -> lessonbook::error::Result<()> {
    let service = &engine.lessons;
    match command {
        Command::Book(cmd) => {
            service.book(cmd, at).await?;
        }
        Command::Attended(cmd) => {
            service.mark_attended(cmd, at).await?;
        }
        Command::Absent(cmd) => {
            service.mark_absent(cmd, at).await?;
        }
        Command::Confirm(cmd) => {
            service.confirm_completion(cmd, at).await?;
        }
        Command::Reschedule(cmd) => {
            service.respond_to_reschedule(cmd, at).await?;
        }
        Command::Payout {
            teacher,
            amount,
            method,
        } => {
            engine
                .payouts
                .request_payout(&teacher, amount, method, at)
                .await?;
        }
        Command::Tick => {}
    }
    Ok(())
}

async fn process(args: ProcessArgs) -> Result<()> {
    let pricing = PricingPolicy::new(args.commission_rate, args.tax_rate).into_diagnostic()?;
    tracing::info!(
        commission_rate = %pricing.commission_rate(),
        tax_rate = %pricing.tax_rate(),
        "pricing configured"
    );
    let engine = build_engine(pricing, args.db_path)?;
    let scheduler = Scheduler::new(engine.lessons.clone());

    let file = File::open(&args.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut clock: Option<DateTime<Utc>> = None;
    for (row, command) in reader.commands().enumerate() {
        let line = row + 2;
        match command {
            Ok(timed) => {
                // Timestamps never run backwards; late rows are processed at the current clock.
                let at = clock.map_or(timed.at, |now| now.max(timed.at));
                clock = Some(at);
                if let Err(error) = scheduler.run_due(at).await {
                    tracing::error!(line, %error, "error running scheduled tasks");
                }
                if let Err(error) = apply(&engine, timed.command, at).await {
                    tracing::error!(line, %error, "error processing command");
                }
            }
            Err(error) => {
                tracing::error!(line, %error, "error reading command");
            }
        }
    }

    if let Some(until) = args.until {
        scheduler.run_due(until).await.into_diagnostic()?;
    }

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    match args.report {
        Report::Lessons => {
            let lessons = engine.lessons.lessons().await.into_diagnostic()?;
            writer.write_lessons(&lessons).into_diagnostic()?;
        }
        Report::Balances => {
            let balances = engine.lessons.balances().await.into_diagnostic()?;
            writer.write_balances(&balances).into_diagnostic()?;
        }
        Report::Payouts => {
            let payouts = engine.payouts.requests().await.into_diagnostic()?;
            writer.write_payouts(&payouts).into_diagnostic()?;
        }
    }
    Ok(())
}

async fn search(args: SearchArgs) -> Result<()> {
    let file = File::open(&args.teachers).into_diagnostic()?;
    let mut teachers = Vec::new();
    for (row, teacher) in TeacherReader::new(file).teachers().enumerate() {
        match teacher {
            Ok(teacher) => teachers.push(teacher),
            Err(error) => tracing::error!(line = row + 2, %error, "error reading teacher"),
        }
    }

    let catalog = Catalog::new(Box::new(InMemoryTeacherDirectory::new(teachers)));
    let query = TeacherQuery {
        language: args.language,
        min_price: args.min_price,
        max_price: args.max_price,
        min_rating: args.min_rating,
        country: args.country,
        search: args.search,
        sort: args.sort,
        page: args.page,
        limit: args.limit,
    };
    let page = catalog.search(&query).await.into_diagnostic()?;
    tracing::info!(total = page.total, page = page.page, limit = page.limit, "search finished");

    let stdout = io::stdout();
    ReportWriter::new(stdout.lock())
        .write_teachers(&page.items)
        .into_diagnostic()
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Process(args) => process(args).await,
        Commands::Search(args) => search(args).await,
    }
}
