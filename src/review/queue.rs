//! Review queue: AI-suggested postings awaiting human confirmation

use tracing::debug;
use uuid::Uuid;

use crate::journal::JournalPoster;
use crate::review::patterns::{
    boosted_confidence, observe_resolution, pattern_from_correction, supplier_key, token_key,
};
use crate::traits::LedgerStorage;
use crate::types::*;

/// Default voucher series for postings born from the review queue
const REVIEW_SERIES: &str = "AI";

/// Staging area for suggested postings. Approvals and corrections go
/// through the journal poster; a review item is only marked resolved
/// after its journal entry actually committed.
pub struct ReviewQueue<S: LedgerStorage + Clone> {
    storage: S,
    poster: JournalPoster<S>,
    series: String,
}

impl<S: LedgerStorage + Clone> ReviewQueue<S> {
    pub fn new(storage: S) -> Self {
        Self {
            poster: JournalPoster::new(storage.clone()),
            storage,
            series: REVIEW_SERIES.to_string(),
        }
    }

    /// Use a different voucher series for review postings
    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = series.into();
        self
    }

    /// Take in a document from the ingestion collaborator and queue it
    /// for review.
    ///
    /// If a learned pattern matches the document's supplier and
    /// description shape, the item's confidence is boosted in
    /// proportion to the pattern's usage history and the suggested
    /// cost line is rewritten to the pattern's target account. A
    /// pattern whose target account no longer resolves in the chart is
    /// skipped entirely.
    pub async fn submit(
        &mut self,
        client_id: ClientId,
        document: IncomingDocument,
    ) -> LedgerResult<ReviewItem> {
        if document.base_confidence > 100 {
            return Err(LedgerError::Validation(format!(
                "Confidence {} is outside 0-100",
                document.base_confidence
            )));
        }
        if document.suggested_lines.is_empty() {
            return Err(LedgerError::Validation(
                "Incoming document carries no suggested posting lines".to_string(),
            ));
        }

        let mut confidence = document.base_confidence;
        let mut suggested_lines = document.suggested_lines;
        let mut suggested_patterns = Vec::new();

        let pattern = self
            .storage
            .find_pattern(
                client_id,
                &supplier_key(&document.supplier),
                &token_key(&document.description),
            )
            .await?;

        if let Some(mut pattern) = pattern {
            // Defensive check against chart drift: never apply a
            // pattern whose target account has gone away.
            let target_resolves = self
                .storage
                .get_account(client_id, &pattern.target_account)
                .await?
                .is_some();

            if target_resolves {
                confidence = boosted_confidence(document.base_confidence, &pattern);
                if let Some(line) = self.cost_line_mut(client_id, &mut suggested_lines).await? {
                    line.account_number = pattern.target_account.clone();
                }
                suggested_patterns.push(pattern.id);

                pattern.match_count += 1;
                pattern.last_used = chrono::Utc::now().naive_utc();
                self.storage.save_pattern(&pattern).await?;

                debug!(
                    %client_id,
                    pattern = %pattern.id,
                    match_count = pattern.match_count,
                    confidence,
                    "pattern matched incoming document"
                );
            }
        }

        let item = ReviewItem {
            id: Uuid::new_v4(),
            client_id,
            kind: document.kind,
            status: ReviewStatus::Pending,
            priority: document.priority,
            confidence,
            supplier: document.supplier,
            description: document.description,
            amount: document.amount,
            document_date: document.document_date,
            suggested_lines,
            suggested_patterns,
            extensions: document.extensions,
            created_at: chrono::Utc::now().naive_utc(),
            resolved_at: None,
        };

        self.storage.save_review_item(&item).await?;
        Ok(item)
    }

    /// Items still awaiting a decision, highest priority first.
    /// Resolved items (including rejections) are excluded.
    pub async fn pending(&self, client_id: ClientId) -> LedgerResult<Vec<ReviewItem>> {
        let mut items = self
            .storage
            .list_review_items(client_id, Some(ReviewStatus::Pending))
            .await?;
        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }

    /// Get one review item by id
    pub async fn get(&self, client_id: ClientId, item_id: Uuid) -> LedgerResult<ReviewItem> {
        self.storage
            .get_review_item(client_id, item_id)
            .await?
            .ok_or(LedgerError::ReviewItemNotFound(item_id))
    }

    /// Resolve a pending item. Resolutions are terminal: a resolved
    /// item can never be resolved again.
    ///
    /// For approve/correct, the journal posting and the status change
    /// are one logical unit: when the posting fails, the item stays
    /// `Pending` in storage and the poster's error is surfaced.
    pub async fn resolve(
        &mut self,
        client_id: ClientId,
        item_id: Uuid,
        action: ReviewAction,
    ) -> LedgerResult<ReviewOutcome> {
        let mut item = self.get(client_id, item_id).await?;

        if item.status != ReviewStatus::Pending {
            return Err(LedgerError::Conflict(format!(
                "Review item {} is already resolved",
                item_id
            )));
        }

        match action {
            ReviewAction::Reject => {
                item.status = ReviewStatus::Rejected;
                item.resolved_at = Some(chrono::Utc::now().naive_utc());
                self.storage.save_review_item(&item).await?;
                debug!(%client_id, item = %item_id, "review item rejected");
                Ok(ReviewOutcome { item, posted: None })
            }
            ReviewAction::Approve => {
                let draft = self.draft_for(&item, item.suggested_lines.clone());
                // Status is only flipped after the commit succeeded;
                // on failure the stored item is still Pending.
                let entry = self.poster.post(client_id, draft).await?;

                item.status = ReviewStatus::Approved;
                item.resolved_at = Some(chrono::Utc::now().naive_utc());
                self.storage.save_review_item(&item).await?;

                self.reinforce_patterns(client_id, &item, None).await?;

                debug!(%client_id, item = %item_id, entry = %entry.id, "review item approved");
                Ok(ReviewOutcome {
                    item,
                    posted: Some(entry),
                })
            }
            ReviewAction::Correct { lines } => {
                let draft = self.draft_for(&item, lines.clone());
                let entry = self.poster.post(client_id, draft).await?;

                item.status = ReviewStatus::Corrected;
                item.resolved_at = Some(chrono::Utc::now().naive_utc());
                self.storage.save_review_item(&item).await?;

                self.learn_from_correction(client_id, &item, &lines).await?;

                debug!(%client_id, item = %item_id, entry = %entry.id, "review item corrected");
                Ok(ReviewOutcome {
                    item,
                    posted: Some(entry),
                })
            }
        }
    }

    fn draft_for(&self, item: &ReviewItem, lines: Vec<JournalLine>) -> VoucherDraft {
        VoucherDraft {
            accounting_date: item.document_date,
            voucher_series: self.series.clone(),
            description: format!("{} - {}", item.supplier, item.description),
            source_type: SourceType::Ai,
            adjustment: false,
            lines,
        }
    }

    /// The cost-bearing line of a suggested posting: the first debit
    /// line resolving to an expense account, falling back to the first
    /// debit line.
    async fn cost_line_mut<'a>(
        &self,
        client_id: ClientId,
        lines: &'a mut [JournalLine],
    ) -> LedgerResult<Option<&'a mut JournalLine>> {
        let mut fallback = None;
        let mut expense_idx = None;

        for (idx, line) in lines.iter().enumerate() {
            if line.side() != Side::Debit {
                continue;
            }
            if fallback.is_none() {
                fallback = Some(idx);
            }
            if let Some(account) = self
                .storage
                .get_account(client_id, &line.account_number)
                .await?
            {
                if account.account_type == AccountType::Expense {
                    expense_idx = Some(idx);
                    break;
                }
            }
        }

        Ok(expense_idx.or(fallback).map(|idx| &mut lines[idx]))
    }

    /// Account the human actually booked the cost to
    async fn corrected_target(
        &self,
        client_id: ClientId,
        lines: &[JournalLine],
    ) -> LedgerResult<Option<String>> {
        let mut lines = lines.to_vec();
        Ok(self
            .cost_line_mut(client_id, &mut lines)
            .await?
            .map(|line| line.account_number.clone()))
    }

    async fn reinforce_patterns(
        &mut self,
        client_id: ClientId,
        item: &ReviewItem,
        corrected_to: Option<&str>,
    ) -> LedgerResult<()> {
        for pattern_id in &item.suggested_patterns {
            if let Some(mut pattern) = self.storage.get_pattern(client_id, *pattern_id).await? {
                observe_resolution(&mut pattern, corrected_to);
                self.storage.save_pattern(&pattern).await?;
            }
        }
        Ok(())
    }

    async fn learn_from_correction(
        &mut self,
        client_id: ClientId,
        item: &ReviewItem,
        corrected_lines: &[JournalLine],
    ) -> LedgerResult<()> {
        let Some(target) = self.corrected_target(client_id, corrected_lines).await? else {
            return Ok(());
        };

        let suggested = self
            .corrected_target(client_id, &item.suggested_lines)
            .await?;
        // A "correction" that kept the suggested account confirms the
        // mapping instead of counting against it.
        let corrected_to = match suggested.as_deref() {
            Some(account) if account == target => None,
            _ => Some(target.as_str()),
        };

        if !item.suggested_patterns.is_empty() {
            return self.reinforce_patterns(client_id, item, corrected_to).await;
        }

        match self
            .storage
            .find_pattern(
                client_id,
                &supplier_key(&item.supplier),
                &token_key(&item.description),
            )
            .await?
        {
            Some(mut pattern) => {
                observe_resolution(&mut pattern, corrected_to);
                self.storage.save_pattern(&pattern).await?;
            }
            None => {
                let pattern =
                    pattern_from_correction(client_id, &item.supplier, &item.description, &target);
                debug!(
                    %client_id,
                    pattern = %pattern.id,
                    target = %target,
                    "learned new pattern from correction"
                );
                self.storage.save_pattern(&pattern).await?;
            }
        }

        Ok(())
    }
}
