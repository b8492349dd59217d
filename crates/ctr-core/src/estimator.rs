//! Naive historical CTR estimator.
//!
//! The estimator has two states. A fresh [`NaiveCtr`] is unfitted and
//! refuses to predict; after [`NaiveCtr::fit`] it holds an immutable
//! [`CtrTable`] mapping item → clicks / impressions. A later `fit` builds a
//! complete new table before swapping it in, so callers never see a
//! partially updated table.
//!
//! Items without history predict as [`UNSEEN_CTR`] (`-1.0`), which is
//! distinct from a real `0.0` (shown, never clicked).

use std::borrow::Borrow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ctr_common::{AggregatedItem, Error, ItemEvent, ItemId, Result, ScoredItem, UNSEEN_CTR};
use ctr_config::{ConfigSnapshot, PipelineConfig, ZeroImpressionPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;

/// Fitted item → CTR lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrTable {
    ctrs: BTreeMap<ItemId, f64>,
    pub fitted_at: DateTime<Utc>,
    /// Hash of the config the table was fitted under, when known.
    pub config_hash: Option<String>,
    /// Items that had clicks but no impressions.
    pub zero_impression_items: u64,
}

impl CtrTable {
    pub fn get(&self, item: &ItemId) -> Option<f64> {
        self.ctrs.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.ctrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctrs.is_empty()
    }

    /// Entries ascending by item id.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, f64)> {
        self.ctrs.iter().map(|(k, v)| (k, *v))
    }
}

/// CTR for one aggregated row, or `None` when the policy drops it.
fn row_ctr(row: &AggregatedItem, policy: ZeroImpressionPolicy) -> Option<f64> {
    if row.impress > 0 {
        return Some(row.click as f64 / row.impress as f64);
    }
    match policy {
        ZeroImpressionPolicy::Zero => Some(0.0),
        ZeroImpressionPolicy::Unseen => None,
    }
}

/// Learns and predicts historical CTR from impression and click counts.
#[derive(Debug, Clone, Default)]
pub struct NaiveCtr {
    policy: ZeroImpressionPolicy,
    config_hash: Option<String>,
    table: Option<CtrTable>,
}

impl NaiveCtr {
    /// Unfitted estimator with the default zero-impression policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unfitted estimator with an explicit zero-impression policy.
    pub fn with_policy(policy: ZeroImpressionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Unfitted estimator taking its policy from `config`; fitted tables
    /// record the config's snapshot hash.
    pub fn with_config(config: &PipelineConfig) -> Self {
        let config_hash = match ConfigSnapshot::capture(config) {
            Ok(snapshot) => Some(snapshot.config_hash),
            Err(e) => {
                warn!(error = %e, "could not hash pipeline config");
                None
            }
        };
        Self {
            policy: config.zero_impression_policy,
            config_hash,
            table: None,
        }
    }

    pub fn policy(&self) -> ZeroImpressionPolicy {
        self.policy
    }

    pub fn is_fitted(&self) -> bool {
        self.table.is_some()
    }

    pub fn table(&self) -> Option<&CtrTable> {
        self.table.as_ref()
    }

    /// Fit on an item-event table, replacing any previous fit.
    pub fn fit<I>(&mut self, events: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Borrow<ItemEvent>,
    {
        let rows = aggregate(events);
        self.fit_aggregated(&rows)
    }

    /// Fit on precomputed per-item counts, replacing any previous fit.
    pub fn fit_aggregated(&mut self, rows: &[AggregatedItem]) -> &mut Self {
        let mut ctrs = BTreeMap::new();
        let mut zero_impression_items = 0u64;

        for row in rows {
            if row.impress == 0 {
                zero_impression_items += 1;
                debug!(item = %row.item, clicks = row.click, "item clicked without impressions");
            }
            if let Some(ctr) = row_ctr(row, self.policy) {
                ctrs.insert(row.item.clone(), ctr);
            }
        }

        if zero_impression_items > 0 {
            warn!(
                items = zero_impression_items,
                policy = ?self.policy,
                "clicks without impressions; upstream logs are inconsistent"
            );
        }

        let table = CtrTable {
            ctrs,
            fitted_at: Utc::now(),
            config_hash: self.config_hash.clone(),
            zero_impression_items,
        };
        info!(items = table.len(), refit = self.is_fitted(), "fitted CTR table");
        self.table = Some(table);
        self
    }

    fn fitted(&self) -> Result<&CtrTable> {
        self.table.as_ref().ok_or(Error::NotFitted)
    }

    /// Historical CTR of an item, `None` when it has no history.
    pub fn lookup(&self, item_id: &ItemId) -> Result<Option<f64>> {
        Ok(self.fitted()?.get(item_id))
    }

    /// Historical CTR of an item, [`UNSEEN_CTR`] when it has no history.
    pub fn predict(&self, item_id: &ItemId) -> Result<f64> {
        Ok(self.lookup(item_id)?.unwrap_or(UNSEEN_CTR))
    }

    /// Score every item id, keeping input order and length.
    pub fn batch_predict<I>(&self, item_ids: I) -> Result<Vec<ScoredItem>>
    where
        I: IntoIterator,
        I::Item: Borrow<ItemId>,
    {
        let table = self.fitted()?;
        let scored: Vec<ScoredItem> = item_ids
            .into_iter()
            .map(|id| {
                let id = id.borrow();
                ScoredItem {
                    item_id: id.clone(),
                    expected_ctr: table.get(id).unwrap_or(UNSEEN_CTR),
                }
            })
            .collect();
        debug!(items = scored.len(), "batch scored");
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(item: &str, click: u64, impress: u64) -> AggregatedItem {
        AggregatedItem {
            item: ItemId::from(item),
            click,
            impress,
        }
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9
    }

    #[test]
    fn unfitted_predict_fails() {
        let model = NaiveCtr::new();
        assert!(!model.is_fitted());
        assert!(matches!(model.predict(&id("i1")), Err(Error::NotFitted)));
        assert!(matches!(model.lookup(&id("i1")), Err(Error::NotFitted)));
    }

    #[test]
    fn unfitted_batch_predict_fails_even_when_empty() {
        let model = NaiveCtr::new();
        let err = model.batch_predict(Vec::<ItemId>::new()).unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn ctr_is_clicks_over_impressions() {
        let mut model = NaiveCtr::new();
        model.fit_aggregated(&[row("i1", 0, 4), row("i2", 1, 5), row("i3", 1, 4)]);
        assert_eq!(model.predict(&id("i1")).unwrap(), 0.0);
        assert!(approx_eq(model.predict(&id("i2")).unwrap(), 0.2));
        assert!(approx_eq(model.predict(&id("i3")).unwrap(), 0.25));
    }

    #[test]
    fn unseen_item_predicts_sentinel() {
        let mut model = NaiveCtr::new();
        model.fit_aggregated(&[row("i1", 0, 3)]);
        assert_eq!(model.predict(&id("i5")).unwrap(), UNSEEN_CTR);
        assert_eq!(model.lookup(&id("i5")).unwrap(), None);
        assert_eq!(model.lookup(&id("i1")).unwrap(), Some(0.0));
    }

    #[test]
    fn zero_impressions_default_to_zero_ctr() {
        let mut model = NaiveCtr::new();
        model.fit_aggregated(&[row("i9", 2, 0)]);
        let ctr = model.predict(&id("i9")).unwrap();
        assert_eq!(ctr, 0.0);
        assert!(!ctr.is_nan());
        assert_eq!(model.table().map(|t| t.zero_impression_items), Some(1));
    }

    #[test]
    fn zero_impressions_unseen_policy_drops_item() {
        let mut model = NaiveCtr::with_policy(ZeroImpressionPolicy::Unseen);
        model.fit_aggregated(&[row("i9", 2, 0), row("i1", 1, 2)]);
        assert_eq!(model.predict(&id("i9")).unwrap(), UNSEEN_CTR);
        assert!(approx_eq(model.predict(&id("i1")).unwrap(), 0.5));
        assert_eq!(model.table().map(CtrTable::len), Some(1));
    }

    #[test]
    fn refit_replaces_table() {
        let mut model = NaiveCtr::new();
        model.fit_aggregated(&[row("i1", 1, 2)]);
        model.fit_aggregated(&[row("i2", 1, 4)]);
        assert_eq!(model.predict(&id("i1")).unwrap(), UNSEEN_CTR);
        assert!(approx_eq(model.predict(&id("i2")).unwrap(), 0.25));
    }

    #[test]
    fn batch_predict_keeps_order_and_duplicates() {
        let mut model = NaiveCtr::new();
        model.fit_aggregated(&[row("i1", 1, 2), row("i2", 0, 2)]);
        let ids = vec![id("i2"), id("zz"), id("i1"), id("i2")];
        let scored = model.batch_predict(&ids).unwrap();
        let got: Vec<(&str, f64)> = scored
            .iter()
            .map(|s| (s.item_id.as_str(), s.expected_ctr))
            .collect();
        assert_eq!(got, vec![("i2", 0.0), ("zz", -1.0), ("i1", 0.5), ("i2", 0.0)]);
    }

    #[test]
    fn with_config_records_hash_and_policy() {
        let mut config = PipelineConfig::default();
        config.zero_impression_policy = ZeroImpressionPolicy::Unseen;
        let mut model = NaiveCtr::with_config(&config);
        assert_eq!(model.policy(), ZeroImpressionPolicy::Unseen);
        model.fit_aggregated(&[]);
        let table = model.table().unwrap();
        assert!(table.is_empty());
        assert_eq!(table.config_hash.as_ref().map(String::len), Some(64));
    }
}
