use crate::error::ScenarioError;
use crate::step::{Action, Expectation, Step};
use api_client::error::ApiError;
use api_client::{deposit_assets, ExchangeClient};
use core_types::{assert_decimal_eq, decimal_eq, AccountRef, Order, OrderRequest, PriceLevel};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Executes steps in order against one market, stopping at the first failure.
pub struct StepRunner<'a, C: ExchangeClient + ?Sized> {
    client: &'a C,
    market: String,
    depth_limit: u32,
    /// Placement responses by label, with the account that placed them.
    placed: HashMap<String, (AccountRef, Order)>,
}

impl<'a, C: ExchangeClient + ?Sized> StepRunner<'a, C> {
    pub fn new(client: &'a C, market: impl Into<String>, depth_limit: u32) -> Self {
        Self {
            client,
            market: market.into(),
            depth_limit,
            placed: HashMap::new(),
        }
    }

    /// Runs every step; returns the number of steps completed.
    pub async fn run(&mut self, steps: &[Step]) -> Result<usize, ScenarioError> {
        for (index, step) in steps.iter().enumerate() {
            tracing::info!(step = index + 1, name = %step.name, "running step");
            if let Some(action) = &step.action {
                self.perform(action).await?;
            }
            for expectation in &step.expect {
                if let Err(e) = self.check(expectation).await {
                    tracing::error!(step = index + 1, name = %step.name, error = %e, "step failed");
                    return Err(e);
                }
            }
        }
        Ok(steps.len())
    }

    /// Order ids of everything placed so far, by label.
    pub fn order_ids(&self) -> BTreeMap<String, u64> {
        self.placed
            .iter()
            .map(|(label, (_, order))| (label.clone(), order.id))
            .collect()
    }

    fn placed(&self, label: &str) -> Result<&(AccountRef, Order), ScenarioError> {
        self.placed
            .get(label)
            .ok_or_else(|| ScenarioError::UnknownLabel(label.to_string()))
    }

    async fn perform(&mut self, action: &Action) -> Result<(), ScenarioError> {
        match action {
            Action::Reset => self.client.reset_state().await?,
            Action::Reload => self.client.reload_state().await?,
            Action::Register(account) => {
                self.client
                    .register_account(
                        &account.account_ref(),
                        account.l1_address.as_deref().unwrap_or_default(),
                        account.l2_pubkey.as_deref().unwrap_or_default(),
                    )
                    .await?
            }
            Action::Deposit { account, assets } => {
                let assets: Vec<(&str, Decimal)> =
                    assets.iter().map(|(asset, amount)| (asset.as_str(), *amount)).collect();
                deposit_assets(self.client, account, &assets).await?
            }
            Action::PlaceLimit {
                label,
                account,
                side,
                amount,
                price,
                fee,
            } => {
                let request =
                    OrderRequest::limit(account.clone(), &self.market, *side, *amount, *price, *fee);
                let order = self.client.place_order(&request).await?;
                tracing::debug!(label = %label, order_id = order.id, "order placed");
                self.placed.insert(label.clone(), (account.clone(), order));
            }
            Action::Cancel { label } => {
                let (account, order) = self.placed(label)?;
                self.client
                    .cancel_order(account, &self.market, order.id)
                    .await?;
            }
        }
        Ok(())
    }

    async fn check(&self, expectation: &Expectation) -> Result<(), ScenarioError> {
        match expectation {
            Expectation::CleanAccount { account, assets } => {
                let balances = self.client.get_balance(account).await?;
                for asset in assets {
                    let entry = balances.get_or_zero(asset);
                    if !decimal_eq(&entry.available, "0")? || !decimal_eq(&entry.frozen, "0")? {
                        return Err(ScenarioError::DirtyState {
                            account: account.clone(),
                            asset: asset.clone(),
                            available: entry.available,
                            frozen: entry.frozen,
                        });
                    }
                }
            }
            Expectation::Balance {
                account,
                asset,
                available,
                frozen,
            } => {
                let entry = self.client.get_balance(account).await?.get_or_zero(asset);
                assert_decimal_eq(
                    &format!("{} {} available", account, asset),
                    &entry.available,
                    &available.to_string(),
                )?;
                assert_decimal_eq(
                    &format!("{} {} frozen", account, asset),
                    &entry.frozen,
                    &frozen.to_string(),
                )?;
            }
            Expectation::OrderMatchesPlacement { label } => {
                let (_, placed) = self.placed(label)?;
                let fetched = self.client.get_order(&self.market, placed.id).await?;
                if &fetched != placed {
                    return Err(ScenarioError::StructureMismatch {
                        context: format!("order '{}' detail", label),
                        expected: format!("{:?}", placed),
                        actual: format!("{:?}", fetched),
                    });
                }
            }
            Expectation::OrderRemaining { label, remain } => {
                let (_, placed) = self.placed(label)?;
                let fetched = self.client.get_order(&self.market, placed.id).await?;
                assert_decimal_eq(
                    &format!("order '{}' remain", label),
                    &fetched.remain,
                    &remain.to_string(),
                )?;
            }
            Expectation::OrderUnknown { label } => {
                let (_, placed) = self.placed(label)?;
                match self.client.get_order(&self.market, placed.id).await {
                    Err(ApiError::UnknownOrder { .. }) => {}
                    Ok(_) => {
                        return Err(ScenarioError::OrderStillQueryable {
                            label: label.clone(),
                            order_id: placed.id,
                        })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Expectation::Summary {
                bid_count,
                bid_amount,
                ask_count,
                ask_amount,
            } => {
                let summary = self.client.get_market_summary(&self.market).await?;
                if summary.bid_count != *bid_count || summary.ask_count != *ask_count {
                    return Err(ScenarioError::StructureMismatch {
                        context: format!("{} summary counts (bid, ask)", self.market),
                        expected: format!("({}, {})", bid_count, ask_count),
                        actual: format!("({}, {})", summary.bid_count, summary.ask_count),
                    });
                }
                assert_decimal_eq("summary bid_amount", &summary.bid_amount, &bid_amount.to_string())?;
                assert_decimal_eq("summary ask_amount", &summary.ask_amount, &ask_amount.to_string())?;
            }
            Expectation::Depth { bids, asks } => {
                // "0" disables merging, so levels come back exactly as placed.
                let depth = self.client.get_depth(&self.market, self.depth_limit, "0").await?;
                check_levels("bids", &depth.bids, bids)?;
                check_levels("asks", &depth.asks, asks)?;
            }
        }
        Ok(())
    }
}

fn check_levels(side: &str, actual: &[PriceLevel], expected: &[(Decimal, Decimal)]) -> Result<(), ScenarioError> {
    if actual.len() != expected.len() {
        return Err(ScenarioError::StructureMismatch {
            context: format!("depth {} levels", side),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        });
    }
    for (i, (level, (price, amount))) in actual.iter().zip(expected).enumerate() {
        assert_decimal_eq(&format!("depth {}[{}] price", side, i), &level.price, &price.to_string())?;
        assert_decimal_eq(&format!("depth {}[{}] amount", side, i), &level.amount, &amount.to_string())?;
    }
    Ok(())
}
