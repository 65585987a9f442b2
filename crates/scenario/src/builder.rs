//! The trade-lifecycle table.
//!
//! Both accounts start empty and receive the same deposit. The ask account
//! places and cancels a probe bid, then rests an ask that the bid account's
//! larger bid consumes at the same price.

use crate::step::{Action, Expectation, Step};
use configuration::ScenarioConfig;
use core_types::{notional, AccountRef, OrderSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const QUOTE_DEPOSIT: Decimal = dec!(100);
pub const BASE_DEPOSIT: Decimal = dec!(50);

pub const PROBE_LABEL: &str = "probe_bid";
pub const ASK_LABEL: &str = "ask";
pub const BID_LABEL: &str = "bid";

const PRICE: Decimal = dec!(1.1);
const PROBE_AMOUNT: Decimal = dec!(10);
const ASK_AMOUNT: Decimal = dec!(4);
const BID_AMOUNT: Decimal = dec!(10);

struct Plan<'a> {
    cfg: &'a ScenarioConfig,
    /// Display precision of the quote asset; reserved notionals are rounded to it.
    quote_precision: u32,
    asker: AccountRef,
    bidder: AccountRef,
}

impl Plan<'_> {
    fn balance(&self, account: &AccountRef, asset: &str, available: Decimal, frozen: Decimal) -> Expectation {
        Expectation::Balance {
            account: account.clone(),
            asset: asset.to_string(),
            available,
            frozen,
        }
    }

    fn base(&self) -> &str {
        &self.cfg.base_asset
    }

    fn quote(&self) -> &str {
        &self.cfg.quote_asset
    }

    fn place(&self, label: &str, account: &AccountRef, side: OrderSide, amount: Decimal) -> Action {
        Action::PlaceLimit {
            label: label.to_string(),
            account: account.clone(),
            side,
            amount,
            price: PRICE,
            fee: self.cfg.fee,
        }
    }

    fn deposit(&self, account: &AccountRef) -> Step {
        Step::new(format!("deposit into {}", account))
            .act(Action::Deposit {
                account: account.clone(),
                assets: vec![
                    (self.quote().to_string(), QUOTE_DEPOSIT),
                    (self.base().to_string(), BASE_DEPOSIT),
                ],
            })
            .expect(self.balance(account, self.quote(), QUOTE_DEPOSIT, Decimal::ZERO))
            .expect(self.balance(account, self.base(), BASE_DEPOSIT, Decimal::ZERO))
    }

    /// What the book and both accounts look like once the ask is fully consumed.
    fn after_trade(&self) -> Vec<Expectation> {
        let traded = ASK_AMOUNT;
        let quote_traded = notional(traded, PRICE, self.quote_precision);
        // Resting ask is the maker, the incoming bid the taker; both pay `fee`.
        let ask_proceeds = quote_traded - quote_traded * self.cfg.fee;
        let bid_proceeds = traded - traded * self.cfg.fee;
        let bid_reserved = notional(BID_AMOUNT, PRICE, self.quote_precision);
        let bid_remain = BID_AMOUNT - traded;

        vec![
            Expectation::OrderRemaining {
                label: BID_LABEL.to_string(),
                remain: bid_remain,
            },
            Expectation::OrderUnknown {
                label: ASK_LABEL.to_string(),
            },
            Expectation::Summary {
                bid_count: 1,
                bid_amount: bid_remain,
                ask_count: 0,
                ask_amount: Decimal::ZERO,
            },
            Expectation::Depth {
                bids: vec![(PRICE, bid_remain)],
                asks: vec![],
            },
            self.balance(&self.asker, self.quote(), QUOTE_DEPOSIT + ask_proceeds, Decimal::ZERO),
            self.balance(&self.asker, self.base(), BASE_DEPOSIT - traded, Decimal::ZERO),
            self.balance(
                &self.bidder,
                self.quote(),
                QUOTE_DEPOSIT - bid_reserved,
                bid_reserved - quote_traded,
            ),
            self.balance(&self.bidder, self.base(), BASE_DEPOSIT + bid_proceeds, Decimal::ZERO),
        ]
    }
}

/// Builds the ordered steps for one run against a freshly reset exchange.
pub fn trade_lifecycle(cfg: &ScenarioConfig, quote_precision: u32) -> Vec<Step> {
    let plan = Plan {
        cfg,
        quote_precision,
        asker: cfg.ask_account.account_ref(),
        bidder: cfg.bid_account.account_ref(),
    };
    let probe_reserved = notional(PROBE_AMOUNT, PRICE, quote_precision);
    let assets = vec![plan.base().to_string(), plan.quote().to_string()];

    let mut steps = vec![Step::new("reset exchange state").act(Action::Reset)];

    if cfg.register_accounts {
        steps.push(Step::new("register ask account").act(Action::Register(cfg.ask_account.clone())));
        steps.push(Step::new("register bid account").act(Action::Register(cfg.bid_account.clone())));
    }

    steps.push(
        Step::new("accounts start empty")
            .expect(Expectation::CleanAccount {
                account: plan.asker.clone(),
                assets: assets.clone(),
            })
            .expect(Expectation::CleanAccount {
                account: plan.bidder.clone(),
                assets,
            }),
    );

    steps.push(plan.deposit(&plan.asker));
    steps.push(plan.deposit(&plan.bidder));

    steps.push(
        Step::new("place resting bid")
            .act(plan.place(PROBE_LABEL, &plan.asker, OrderSide::Bid, PROBE_AMOUNT))
            .expect(plan.balance(
                &plan.asker,
                plan.quote(),
                QUOTE_DEPOSIT - probe_reserved,
                probe_reserved,
            ))
            .expect(Expectation::OrderMatchesPlacement {
                label: PROBE_LABEL.to_string(),
            })
            .expect(Expectation::Summary {
                bid_count: 1,
                bid_amount: PROBE_AMOUNT,
                ask_count: 0,
                ask_amount: Decimal::ZERO,
            })
            .expect(Expectation::Depth {
                bids: vec![(PRICE, PROBE_AMOUNT)],
                asks: vec![],
            }),
    );

    steps.push(
        Step::new("cancel resting bid")
            .act(Action::Cancel {
                label: PROBE_LABEL.to_string(),
            })
            .expect(plan.balance(&plan.asker, plan.quote(), QUOTE_DEPOSIT, Decimal::ZERO))
            .expect(Expectation::OrderUnknown {
                label: PROBE_LABEL.to_string(),
            })
            .expect(Expectation::Depth {
                bids: vec![],
                asks: vec![],
            }),
    );

    steps.push(
        Step::new("rest ask")
            .act(plan.place(ASK_LABEL, &plan.asker, OrderSide::Ask, ASK_AMOUNT))
            .expect(plan.balance(&plan.asker, plan.base(), BASE_DEPOSIT - ASK_AMOUNT, ASK_AMOUNT)),
    );

    steps.push(
        Step::new("cross with larger bid")
            .act(plan.place(BID_LABEL, &plan.bidder, OrderSide::Bid, BID_AMOUNT))
            .expect_all(plan.after_trade()),
    );

    if cfg.verify_reload {
        steps.push(
            Step::new("reload exchange state")
                .act(Action::Reload)
                .expect_all(plan.after_trade()),
        );
    }

    steps
}
