use configuration::AccountConfig;
use core_types::{AccountRef, OrderSide};
use rust_decimal::Decimal;

/// A remote operation performed at the start of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Reset,
    Register(AccountConfig),
    Deposit {
        account: AccountRef,
        assets: Vec<(String, Decimal)>,
    },
    /// Places a limit order and remembers the response under `label`.
    PlaceLimit {
        label: String,
        account: AccountRef,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
        fee: Decimal,
    },
    Cancel {
        label: String,
    },
    Reload,
}

/// State the exchange must show once the step's action has completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Every listed asset is at zero; anything else means the environment was not reset.
    CleanAccount {
        account: AccountRef,
        assets: Vec<String>,
    },
    Balance {
        account: AccountRef,
        asset: String,
        available: Decimal,
        frozen: Decimal,
    },
    /// `get_order` returns exactly what the placement returned.
    OrderMatchesPlacement { label: String },
    OrderRemaining { label: String, remain: Decimal },
    /// `get_order` must fail with `UnknownOrder`.
    OrderUnknown { label: String },
    Summary {
        bid_count: u32,
        bid_amount: Decimal,
        ask_count: u32,
        ask_amount: Decimal,
    },
    /// Levels as `(price, amount)`, best first.
    Depth {
        bids: Vec<(Decimal, Decimal)>,
        asks: Vec<(Decimal, Decimal)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub action: Option<Action>,
    pub expect: Vec<Expectation>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: None,
            expect: Vec::new(),
        }
    }

    pub fn act(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expect.push(expectation);
        self
    }

    pub fn expect_all(mut self, expectations: impl IntoIterator<Item = Expectation>) -> Self {
        self.expect.extend(expectations);
        self
    }
}
