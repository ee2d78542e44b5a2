// =====================================================
// TABLE COMPARE MODULE
// Table enumeration, row counts and the ranked aggregate
// diff report, backed by the comparison cache
// =====================================================

use crate::db::endpoint::{
    close_pair, open_pair, resolve_config_pair, ConnectionSource, EndpointConnector, SqlEndpoint,
};
use crate::db_types::{
    notify_progress, CompareStage, ComparisonReport, ConnectionConfig, ProgressEvent,
    ProgressSender, ProjectContext, TableDiffEntry,
};
use crate::error::{DbSyncError, Result};
use crate::store::{ComparisonCache, HistoryStore, LocalStore};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub force_refresh: bool,
    pub progress: Option<ProgressSender>,
    pub cancel: Option<CancellationToken>,
}

impl CompareOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Ranking used for every aggregate report.
///
/// Missing tables first, then different before same, then larger
/// difference first among different tables, then table name.
pub fn compare_entries(a: &TableDiffEntry, b: &TableDiffEntry) -> Ordering {
    b.is_missing()
        .cmp(&a.is_missing())
        .then_with(|| b.different.cmp(&a.different))
        .then_with(|| {
            if a.different && b.different {
                b.difference.cmp(&a.difference)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.table_name.cmp(&b.table_name))
}

pub fn sort_entries(entries: &mut [TableDiffEntry]) {
    entries.sort_by(compare_entries);
}

pub struct TableCompareEngine {
    connector: Arc<dyn EndpointConnector>,
    cache: ComparisonCache,
    history: HistoryStore,
}

impl TableCompareEngine {
    pub fn new(connector: Arc<dyn EndpointConnector>, store: &LocalStore) -> Self {
        Self {
            connector,
            cache: store.cache(),
            history: store.history(),
        }
    }

    /// Drops every cached report.
    pub async fn clear(&self) -> Result<u64> {
        self.cache.invalidate_all().await
    }

    pub async fn compare_project(
        &self,
        source: &dyn ConnectionSource,
        ctx: &ProjectContext,
        options: CompareOptions,
    ) -> Result<ComparisonReport> {
        let (left, right) = resolve_config_pair(source, ctx).await?;
        self.compare(&left, &right, options).await
    }

    pub async fn compare(
        &self,
        conn1: &ConnectionConfig,
        conn2: &ConnectionConfig,
        options: CompareOptions,
    ) -> Result<ComparisonReport> {
        if !options.force_refresh {
            match self.cache.get(conn1, conn2).await {
                Ok(Some(entry)) => {
                    log::info!(
                        "Comparison cache hit for {} / {} ({} tables)",
                        conn1.database,
                        conn2.database,
                        entry.report.total_tables
                    );
                    let mut report = entry.report;
                    report.from_cache = true;
                    return Ok(report);
                }
                Ok(None) => log::debug!("Comparison cache miss for {} / {}", conn1.database, conn2.database),
                Err(e) => log::warn!("Comparison cache unavailable, comparing live: {}", e),
            }
        }

        if options.is_cancelled() {
            return Err(DbSyncError::Cancelled);
        }

        log::info!("Comparing {} with {}", conn1.database, conn2.database);
        let (left, right) = open_pair(self.connector.as_ref(), conn1, conn2).await?;
        let collected = collect_entries(left.as_ref(), right.as_ref(), &options).await;
        close_pair(left, right).await;

        let mut entries = collected?;
        sort_entries(&mut entries);

        let report = ComparisonReport {
            total_tables: entries.len(),
            entries,
            db1_name: conn1.database.clone(),
            db2_name: conn2.database.clone(),
            db1_display_name: conn1.display_label(),
            db2_display_name: conn2.display_label(),
            from_cache: false,
            generated_at: chrono::Utc::now(),
        };

        if let Err(e) = self.history.append_comparison(&report).await {
            log::warn!("Failed to record comparison history: {}", e);
        }
        if let Err(e) = self.cache.put(conn1, conn2, &report).await {
            log::warn!("Failed to cache comparison: {}", e);
        }

        let stats = report.stats();
        log::info!(
            "Comparison finished: {} tables, {} different, {} missing",
            stats.total_tables,
            stats.different_tables,
            stats.missing_tables
        );
        Ok(report)
    }
}

async fn collect_entries(
    left: &dyn SqlEndpoint,
    right: &dyn SqlEndpoint,
    options: &CompareOptions,
) -> Result<Vec<TableDiffEntry>> {
    let progress = options.progress.as_ref();
    notify_progress(
        progress,
        ProgressEvent {
            current: 0,
            total: 0,
            current_label: String::new(),
            stage: CompareStage::ListingTables,
        },
    );

    let left_tables: HashSet<String> = left.list_tables().await?.into_iter().collect();
    let right_tables: HashSet<String> = right.list_tables().await?.into_iter().collect();
    let names: BTreeSet<&String> = left_tables.iter().chain(right_tables.iter()).collect();
    let total = names.len();

    let mut entries = Vec::with_capacity(total);
    for (idx, name) in names.into_iter().enumerate() {
        if options.is_cancelled() {
            log::info!("Comparison cancelled after {} of {} tables", idx, total);
            return Err(DbSyncError::Cancelled);
        }

        let exists1 = left_tables.contains(name);
        let exists2 = right_tables.contains(name);
        let count1 = if exists1 { left.count_rows(name).await? } else { 0 };
        let count2 = if exists2 { right.count_rows(name).await? } else { 0 };
        entries.push(TableDiffEntry::new(name, exists1, count1, exists2, count2));

        notify_progress(
            progress,
            ProgressEvent {
                current: idx + 1,
                total,
                current_label: name.clone(),
                stage: CompareStage::CountingRows,
            },
        );
    }

    Ok(entries)
}
