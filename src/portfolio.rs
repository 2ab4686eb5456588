use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::Serialize;

/// Budget used when the brief gives none (or zero).
pub const DEFAULT_BUDGET: u64 = 5000;
/// Dollar size of one allocation lot.
pub const LOT_SIZE: u64 = 500;

/// Tags on the reference ticker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolCategory {
    Growth,
    BroadEtf,
    IntlEtf,
    Bonds,
    BondsShort,
    SectorEnergy,
    SectorHealth,
}

pub const DEFAULT_POOL: &[(&str, PoolCategory)] = &[
    ("AAPL", PoolCategory::Growth),
    ("MSFT", PoolCategory::Growth),
    ("NVDA", PoolCategory::Growth),
    ("VOO", PoolCategory::BroadEtf),
    ("VXUS", PoolCategory::IntlEtf),
    ("IEF", PoolCategory::Bonds),
    ("SHY", PoolCategory::BondsShort),
    ("XLE", PoolCategory::SectorEnergy),
    ("XLV", PoolCategory::SectorHealth),
];

/// Categories the heuristic assigns weight to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Growth,
    BroadEtf,
    Bonds,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Growth, Category::BroadEtf, Category::Bonds];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Growth => "growth",
            Category::BroadEtf => "broad_etf",
            Category::Bonds => "bonds",
        }
    }

    /// Pool tags whose tickers fill this category's bucket.
    pub fn members(&self) -> &'static [PoolCategory] {
        match self {
            Category::Growth => &[PoolCategory::Growth],
            Category::BroadEtf => &[PoolCategory::BroadEtf],
            Category::Bonds => &[PoolCategory::Bonds, PoolCategory::BondsShort],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rule of the heuristic picked the weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Horizon under a year: mostly bonds.
    ShortHorizon,
    /// Investor aged 55+: moderate bonds.
    Mature,
    /// Everything else: growth and broad ETFs.
    Growth,
}

const SHORT_HORIZON_MONTHS: i32 = 12;
const MATURE_AGE: u32 = 55;

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::ShortHorizon, Branch::Mature, Branch::Growth];

    pub fn select(horizon_months: Option<i32>, age: Option<u32>) -> Self {
        match (horizon_months, age) {
            (Some(h), _) if h < SHORT_HORIZON_MONTHS => Branch::ShortHorizon,
            (_, Some(a)) if a >= MATURE_AGE => Branch::Mature,
            _ => Branch::Growth,
        }
    }

    /// Category weights for this branch; each table sums to 1.0.
    pub fn weights(&self) -> &'static [(Category, f64)] {
        match self {
            Branch::ShortHorizon => &[
                (Category::Bonds, 0.60),
                (Category::BroadEtf, 0.30),
                (Category::Growth, 0.10),
            ],
            Branch::Mature => &[
                (Category::Bonds, 0.50),
                (Category::BroadEtf, 0.35),
                (Category::Growth, 0.15),
            ],
            Branch::Growth => &[
                (Category::BroadEtf, 0.45),
                (Category::Growth, 0.40),
                (Category::Bonds, 0.15),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRecipe {
    pub budget: u64,
    pub branch: Branch,
    pub weights: Vec<(Category, f64)>,
    pub buckets: BTreeMap<Category, Vec<&'static str>>,
}

/// One line of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub ticker: String,
    pub quantity: u64,
}

impl Position {
    pub fn new(ticker: impl Into<String>, quantity: u64) -> Self {
        Self {
            ticker: ticker.into(),
            quantity,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.ticker, self.quantity)
    }
}

/// Ticker lists per category, drawn from `DEFAULT_POOL` in pool order.
pub fn buckets() -> BTreeMap<Category, Vec<&'static str>> {
    Category::ALL
        .iter()
        .map(|cat| {
            let tickers = DEFAULT_POOL
                .iter()
                .filter(|(_, tag)| cat.members().contains(tag))
                .map(|(ticker, _)| *ticker)
                .collect();
            (*cat, tickers)
        })
        .collect()
}

/// Short horizon or older age leans to bonds; otherwise growth and broad ETFs.
pub fn choose_allocation(
    budget: Option<u64>,
    horizon_months: Option<i32>,
    age: Option<u32>,
) -> AllocationRecipe {
    let budget = budget.filter(|b| *b > 0).unwrap_or(DEFAULT_BUDGET);
    let branch = Branch::select(horizon_months, age);
    debug!("Allocation branch {:?} for horizon={:?} age={:?}", branch, horizon_months, age);

    AllocationRecipe {
        budget,
        branch,
        weights: branch.weights().to_vec(),
        buckets: buckets(),
    }
}

pub fn budget_to_lots(budget: u64) -> u64 {
    (budget / LOT_SIZE).max(1)
}

/// Lots for one category. Ties round half to even, so 2.5 -> 2 and 7.5 -> 8.
fn category_lots(total_lots: u64, weight: f64) -> u64 {
    let lots = (total_lots as f64 * weight).round_ties_even();
    if lots > 0.0 {
        lots as u64
    } else {
        0
    }
}

/// Split the budget into lots, deal them round-robin within each category's
/// bucket, and merge per ticker. The result is sorted by ticker.
///
/// Dealing `n` lots over `len` tickers gives each `n / len`, and the first
/// `n % len` tickers one more.
pub fn allocate_positions<S: AsRef<str>>(
    budget: u64,
    weights: &[(Category, f64)],
    buckets: &BTreeMap<Category, Vec<S>>,
) -> Vec<Position> {
    let lots = budget_to_lots(budget);
    let mut merged: BTreeMap<&str, u64> = BTreeMap::new();

    for (cat, weight) in weights {
        let tickers = match buckets.get(cat) {
            Some(t) if !t.is_empty() => t,
            _ => {
                debug!("No tickers for category {}, skipping", cat);
                continue;
            }
        };

        let cat_lots = category_lots(lots, *weight);
        let len = tickers.len() as u64;
        let (base, extra) = (cat_lots / len, cat_lots % len);
        for (i, ticker) in tickers.iter().enumerate() {
            let share = base + u64::from((i as u64) < extra);
            if share > 0 {
                let qty = merged.entry(ticker.as_ref()).or_insert(0);
                *qty = qty.saturating_add(share);
            }
        }
    }

    merged
        .into_iter()
        .map(|(ticker, quantity)| Position::new(ticker, quantity))
        .collect()
}
