use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ListingKey;
use crate::store::ListingStore;

/// How the tracked price of a known listing is updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePolicy {
    /// Keep the lowest price ever observed.
    #[default]
    Minimum,
    /// Overwrite with the latest observed price.
    Latest,
}

/// What to do with a listing seen on a catalog page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Unknown listing: extract and store its detail record.
    Create,
    /// Known listing: persist this value as its tracked price.
    UpdatePrice(i64),
    /// Known listing without a usable observed price.
    Keep,
}

pub struct DedupCoordinator {
    policy: PricePolicy,
}

impl DedupCoordinator {
    pub fn new(policy: PricePolicy) -> Self {
        Self { policy }
    }

    pub fn decide<S>(&self, store: &S, key: &ListingKey, observed: Option<i64>) -> Result<Decision>
    where
        S: ListingStore + ?Sized,
    {
        if !store.exists(key)? {
            return Ok(Decision::Create);
        }
        let Some(observed) = observed else {
            return Ok(Decision::Keep);
        };
        let price = match self.policy {
            PricePolicy::Latest => observed,
            PricePolicy::Minimum => match store.lowest_price(key)? {
                Some(lowest) => lowest.min(observed),
                None => observed,
            },
        };
        Ok(Decision::UpdatePrice(price))
    }
}
