//! # Dispatch
//!
//! Walks the sorted master list and calls one handler per maximal run of
//! records sharing a `(pass, technique)` pair. The sentinel's bucket never
//! matches a real one, so the last run ends without a bounds check.

use crate::consolidate::MasterList;
use crate::technique::{TaskRun, TechniqueTable};

/// Dispatches every run in `master`, returning the number of handler calls.
pub(crate) fn dispatch<C>(
    master: &MasterList,
    techniques: &TechniqueTable<C>,
    shared: &mut C,
) -> usize {
    let records = master.records();
    let mut cursor = 0;
    let mut runs = 0;

    while let Some(first) = records.get(cursor) {
        let key = first.key();
        if key.is_sentinel() {
            break;
        }

        let group = key.group();
        let run_end = cursor
            + 1
            + records[cursor + 1..]
                .iter()
                .take_while(|record| record.key().group() == group)
                .count();

        let run = TaskRun::new(key.pass(), key.technique(), &records[cursor..run_end]);
        match techniques.get(run.technique()) {
            Some(handler) => {
                handler.execute(run, shared);
                runs += 1;
            }
            None => tracing::error!(
                "no handler for technique {}; skipping {} tasks in pass {}",
                run.technique(),
                run.len(),
                run.pass()
            ),
        }

        cursor = run_end;
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::consolidate;
    use crate::registry::FrameRegistry;
    use crate::task_list::{TaskPage, TaskRecord};
    use oroboros_core::SortKey;

    type Log = Vec<(u8, u8, usize)>;

    fn table(count: u8) -> TechniqueTable<Log> {
        let mut builder = TechniqueTable::builder(count);
        for technique in 0..count {
            builder = builder
                .register(technique, |run, log: &mut Log| {
                    log.push((run.pass(), run.technique(), run.len()));
                })
                .unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_runs_partition_master_list() {
        let registry = FrameRegistry::new(4, 4);
        let page = TaskPage::try_new(16).unwrap();
        for (pass, technique, priority) in [(0, 1, 5), (0, 1, 2), (0, 2, 0), (1, 1, 9), (0, 1, 7)] {
            page.push(TaskRecord::marker(SortKey::encode(pass, technique, priority).unwrap()))
                .unwrap();
        }
        assert!(registry.register_task_list(page));

        let master = consolidate(&registry, 2, 3).unwrap();
        let mut log = Log::new();
        let runs = dispatch(&master, &table(4), &mut log);

        assert_eq!(runs, log.len());
        assert_eq!(
            log,
            vec![
                (0, 0, 1),
                (0, 1, 3),
                (0, 2, 1),
                (0, 3, 1),
                (1, 0, 1),
                (1, 1, 1),
                (1, 3, 1),
            ]
        );
        // Every record except the sentinel lands in exactly one run.
        let dispatched: usize = log.iter().map(|&(_, _, len)| len).sum();
        assert_eq!(dispatched, master.len() - 1);
    }

    #[test]
    fn test_empty_frame_dispatches_markers_only() {
        let registry = FrameRegistry::new(1, 1);
        let master = consolidate(&registry, 7, 1).unwrap();

        let mut log = Log::new();
        assert_eq!(dispatch(&master, &table(2), &mut log), 14);
        for (pass, pair) in log.chunks(2).enumerate() {
            assert_eq!(pair, &[(pass as u8, 0, 1), (pass as u8, 1, 1)]);
        }
    }
}
