use anyhow::{bail, Context};
use barakah_ledger::ledger::{
    NewBusiness, RecordTransaction, RetryPolicy, TransactionRecorder, TransactionType, UserProfile,
};
use barakah_ledger::store::{LedgerStore, SeaOrmStore};
use rust_decimal::Decimal;
use std::env;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

struct DemoBusiness {
    owner: &'static str,
    name: &'static str,
    category: &'static str,
    description: &'static str,
    location: &'static str,
    goal: i64,
    breakdown: &'static str,
    /// (contributor, type, amount)
    funding: &'static [(&'static str, TransactionType, i64)],
}

const USERS: &[(&str, &str)] = &[
    ("owner1", "Amina Yusuf"),
    ("owner2", "Yusuf Khan"),
    ("owner3", "Farida Ahmed"),
    ("owner4", "Layla Ibrahim"),
    ("c1", "Samira A."),
    ("c2", "David L."),
    ("c3", "Maria G."),
    ("c4", "Chen W."),
];

const BUSINESSES: &[DemoBusiness] = &[
    DemoBusiness {
        owner: "owner1",
        name: "Amina's Artisanal Coffee",
        category: "Food & Beverage",
        description: "A mobile coffee cart bringing specialty coffee to the local community.",
        location: "City Park, Downtown",
        goal: 1200,
        breakdown: "Espresso machine and cart refit",
        funding: &[
            ("c3", TransactionType::Loan, 1000),
            ("c1", TransactionType::Donation, 200),
        ],
    },
    DemoBusiness {
        owner: "owner2",
        name: "Yusuf's Eid Bakery",
        category: "Crafts & Goods",
        description: "A home-based bakery for traditional sweets. Funding needed for a new oven.",
        location: "Greenwood Neighborhood",
        goal: 800,
        breakdown: "Convection oven",
        funding: &[
            ("c3", TransactionType::Loan, 400),
            ("c1", TransactionType::Loan, 150),
        ],
    },
    DemoBusiness {
        owner: "owner3",
        name: "Farida's Bike Repair",
        category: "Services",
        description: "A community bike repair stand promoting sustainable transport.",
        location: "Riverfront Path",
        goal: 500,
        breakdown: "Tools and a repair stand",
        funding: &[
            ("c4", TransactionType::Loan, 150),
            ("c2", TransactionType::Donation, 100),
        ],
    },
    DemoBusiness {
        owner: "owner4",
        name: "Layla's Local Weaving",
        category: "Arts & Culture",
        description: "Handwoven textiles using traditional techniques. Seeking funds for sustainable yarn.",
        location: "Oakwood Community Center",
        goal: 950,
        breakdown: "Yarn and a second loom",
        funding: &[("c2", TransactionType::Donation, 100)],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing (INFO level)
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load .env (if present) so DATABASE_URL from file is visible
    let _ = dotenvy::dotenv();

    let args: Vec<String> = env::args().collect();
    let migrate_only = args.iter().any(|a| a == "--migrate-only");

    let url = match env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => bail!("DATABASE_URL must be set to seed a database"),
    };

    let store = SeaOrmStore::connect(&url, 2).await.context("connecting to the ledger database")?;
    store.migrate().await.context("running migrations")?;
    info!("migrations applied");
    if migrate_only {
        return Ok(());
    }

    let store: Arc<dyn LedgerStore> = Arc::new(store);
    if !store.list_businesses(BUSINESSES[0].owner).await?.is_empty() {
        info!("demo data already present; nothing to do");
        return Ok(());
    }

    let recorder = TransactionRecorder::new(store.clone(), RetryPolicy::default());

    for (id, name) in USERS {
        recorder
            .register_user(UserProfile { id: id.to_string(), display_name: Some(name.to_string()) })
            .await?;
    }

    for demo in BUSINESSES {
        let business = recorder
            .create_business(NewBusiness {
                owner_id: demo.owner.to_string(),
                name: demo.name.to_string(),
                category: Some(demo.category.to_string()),
                description: Some(demo.description.to_string()),
                location: Some(demo.location.to_string()),
            })
            .await?;
        let request = recorder
            .create_funding_request(
                demo.owner,
                business.id,
                Decimal::from(demo.goal),
                Some(demo.breakdown.to_string()),
                None,
            )
            .await?;

        for (contributor, kind, amount) in demo.funding {
            recorder
                .record_transaction(RecordTransaction {
                    funding_request_id: request.id,
                    contributor_id: contributor.to_string(),
                    borrower_id: None,
                    amount: Decimal::from(*amount),
                    kind: *kind,
                })
                .await
                .with_context(|| format!("funding {}", demo.name))?;
        }
        info!(business = demo.name, request_id = %request.id, "seeded");
    }

    info!("seed finished");
    Ok(())
}
