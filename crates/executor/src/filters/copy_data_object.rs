//! Subtree copies
//!
//! Planning emits structure-only `Copy` actions, so execute mode allocates
//! zeroed arrays through the allocator. `run` then copies element data with
//! one task per array on a [`ParallelTaskRunner`].
//!
//! Selected objects must be disjoint: no source may lie inside another
//! source or inside another source's copy, so every array is read or
//! written by exactly one task.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use structura_concurrency::ParallelTaskRunner;
use structura_core::{DataId, DataPath, Diagnostic, Outcome, StructuraError, StructuraResult};
use structura_engine::{Action, ActionPlan};
use structura_storage::DataGraph;

use crate::filter::{ExecutionContext, Filter, FilterId, PlanOutcome};
use crate::filters::CONTAINERS;
use crate::parameters::{Arguments, Parameter, Parameters};

/// Copies objects, with their descendants, next to the source or under a new parent
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyDataObject;

/// `(source, destination)` for every selected object
fn destinations(args: &Arguments) -> StructuraResult<Vec<(DataPath, DataPath)>> {
    let suffix = args.string("suffix")?;
    let new_parent = if args.bool("use_new_parent")? {
        Some(args.path("new_parent")?.clone())
    } else {
        None
    };
    args.path_list("sources")?
        .iter()
        .map(|source| {
            let name = source
                .name()
                .ok_or_else(|| StructuraError::invalid_parameter("sources", "empty path"))?;
            let parent = match &new_parent {
                Some(parent) => parent.clone(),
                None => source.parent().unwrap_or_else(DataPath::empty),
            };
            let destination = parent.join(&format!("{}{}", name, suffix))?;
            Ok((source.clone(), destination))
        })
        .collect()
}

/// Reject selections whose subtrees or copies overlap
fn check_disjoint(copies: &[(DataPath, DataPath)]) -> StructuraResult<()> {
    for (i, (source, _)) in copies.iter().enumerate() {
        for (j, (other, other_copy)) in copies.iter().enumerate() {
            if i == j {
                continue;
            }
            if source.starts_with(other) {
                return Err(StructuraError::invalid_parameter(
                    "sources",
                    format!("{} overlaps {}, which is also selected", source, other),
                ));
            }
            if source.starts_with(other_copy) {
                return Err(StructuraError::invalid_parameter(
                    "sources",
                    format!("{} lies inside {}, the copy of {}", source, other_copy, other),
                ));
            }
        }
    }
    Ok(())
}

/// Source/destination id pairs for every array in the copied subtrees
fn array_pairs(graph: &DataGraph, copies: &[(DataPath, DataPath)]) -> StructuraResult<Vec<(DataId, DataId)>> {
    let mut pairs = Vec::new();
    for (source, destination) in copies {
        if graph.resolve(source)?.object_type().is_array() {
            pairs.push((graph.resolve_id(source)?, graph.resolve_id(destination)?));
        }
        for path in graph.descendant_paths(source, |t| t.is_array())? {
            let copied = path
                .replace_prefix(source, destination)
                .ok_or_else(|| StructuraError::internal(format!("{} is not under {}", path, source)))?;
            pairs.push((graph.resolve_id(&path)?, graph.resolve_id(&copied)?));
        }
    }
    Ok(pairs)
}

impl CopyDataObject {
    fn build(&self, graph: &DataGraph, args: &Arguments, outcome: &mut PlanOutcome) -> StructuraResult<ActionPlan> {
        let copies = destinations(args)?;
        check_disjoint(&copies)?;
        let mut plan = ActionPlan::new();
        for (source, destination) in copies {
            if source == destination {
                return Err(StructuraError::invalid_parameter(
                    "suffix",
                    format!("copying {} onto itself needs a suffix or a new parent", source),
                ));
            }
            if destination.is_descendant_of(&source) {
                return Err(StructuraError::CyclicMove {
                    path: source,
                    target: destination,
                });
            }
            if graph.contains(&destination) {
                outcome.push_preview("Exists", &destination);
            } else {
                outcome.push_preview("Copy", &destination);
            }
            plan.push(Action::Copy {
                source,
                destination,
                copy_data: false,
            });
        }
        Ok(plan)
    }
}

impl Filter for CopyDataObject {
    fn name(&self) -> &'static str {
        "copy_data_object"
    }

    fn uuid(&self) -> FilterId {
        FilterId::from_u128(0x5e8b2c71_a34f_4f90_b6d2_8a1c0e7f3b05)
    }

    fn human_name(&self) -> &'static str {
        "Copy Data Object"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::path_list("sources", "Objects to Copy", &[]));
        params.insert(Parameter::bool("use_new_parent", "Copy to New Parent", false));
        params.insert(Parameter::data_path("new_parent", "New Parent", CONTAINERS));
        params.insert(Parameter::string("suffix", "Copy Suffix", "_COPY"));
        params.link("use_new_parent", true, "new_parent");
        params
    }

    fn plan(&self, graph: &DataGraph, args: &Arguments) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();
        match self.build(graph, args, &mut outcome) {
            Ok(plan) => outcome.plan = plan,
            Err(e) => outcome.push_error(e),
        }
        outcome
    }

    fn run(&self, graph: &mut DataGraph, args: &Arguments, ctx: &ExecutionContext<'_>) -> Outcome<()> {
        let pairs = match destinations(args).and_then(|copies| array_pairs(graph, &copies)) {
            Ok(pairs) => pairs,
            Err(e) => return Outcome::error(e),
        };
        let total = pairs.len();
        let arrays = match graph.array_pairs_mut(&pairs) {
            Ok(arrays) => arrays,
            Err(e) => return Outcome::error(e),
        };

        let failures: Mutex<Vec<Diagnostic>> = Mutex::new(Vec::new());
        let copied = AtomicUsize::new(0);
        let cancel = ctx.cancel_token();
        ParallelTaskRunner::scope(ctx.parallel_config(), |runner| {
            for (source, destination) in arrays {
                if cancel.is_cancelled() {
                    break;
                }
                let failures = &failures;
                let copied = &copied;
                runner.execute(move || {
                    if cancel.is_cancelled() {
                        return;
                    }
                    match destination.copy_data_from(source) {
                        Ok(()) => {
                            copied.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => failures.lock().push(Diagnostic::from(e)),
                    }
                });
            }
        });

        let copied = copied.into_inner();
        ctx.progress(format!("Copied {}/{} arrays", copied, total));
        let failures = failures.into_inner();
        if failures.is_empty() {
            Outcome::ok(())
        } else {
            Outcome::errors(failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> DataPath {
        DataPath::parse(text).unwrap()
    }

    fn args(sources: &[&str]) -> Arguments {
        let args = Arguments::new().with("sources", sources.iter().map(|s| path(s)).collect::<Vec<_>>());
        CopyDataObject.parameters().validate(&args).result.unwrap()
    }

    #[test]
    fn default_destination_is_a_suffixed_sibling() {
        let copies = destinations(&args(&["G/AM/X", "Top"])).unwrap();
        assert_eq!(copies[0].1, path("G/AM/X_COPY"));
        assert_eq!(copies[1].1, path("Top_COPY"));
    }

    #[test]
    fn copying_onto_itself_is_rejected() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        let args = args(&["G"]).with("suffix", "");
        let outcome = CopyDataObject.plan(&graph, &args);
        assert!(!outcome.is_ok());
    }

    #[test]
    fn overlapping_sources_are_rejected() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        graph.create_group(&path("G"), "X").unwrap();
        for sources in [&["G/X", "G"][..], &["G", "G/X"], &["G", "G"], &["G", "G_COPY/Y"]] {
            let outcome = CopyDataObject.plan(&graph, &args(sources));
            assert!(!outcome.is_ok(), "{:?}", sources);
            assert_eq!(outcome.errors[0].code, StructuraError::invalid_parameter("sources", "").code());
            assert!(outcome.plan.is_empty());
        }
        assert!(CopyDataObject.plan(&graph, &args(&["G/X", "G_other"])).is_ok());
    }

    #[test]
    fn copying_under_itself_is_rejected() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        let args = args(&["G"]).with("use_new_parent", true).with("new_parent", path("G"));
        let outcome = CopyDataObject.plan(&graph, &args);
        assert_eq!(
            outcome.errors[0].code,
            StructuraError::CyclicMove {
                path: path("G"),
                target: path("G/G_COPY")
            }
            .code()
        );
    }
}
