// src/steps/plan.rs
//! Turning a step table into a validated, topologically ordered plan.
//!
//! Planning is pure: a cycle, a dependency on an undeclared step or a
//! duplicate id is reported before any step runs.

use super::Step;
use crate::error::PlanError;
use crate::types::StepId;
use std::collections::{HashMap, HashSet, VecDeque};

/// A step table ordered so every step comes after its dependencies.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    steps: Vec<Step>,
    dependents: HashMap<StepId, Vec<StepId>>,
}

impl ExecutionPlan {
    /// Steps in topological order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_ids(&self) -> Vec<&StepId> {
        self.steps.iter().map(|step| &step.id).collect()
    }

    /// Steps that list `id` as a direct dependency.
    pub fn dependents_of(&self, id: &StepId) -> &[StepId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every step that depends on `id`, directly or transitively.
    pub fn transitive_dependents(&self, id: &StepId) -> Vec<StepId> {
        let mut seen: HashSet<&StepId> = HashSet::new();
        let mut queue: VecDeque<&StepId> = self.dependents_of(id).iter().collect();
        let mut found = Vec::new();

        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                found.push(next.clone());
                queue.extend(self.dependents_of(next));
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Validates a step table and orders it topologically.
///
/// Among steps that are ready at the same time, declaration order wins.
pub fn plan(steps: Vec<Step>) -> Result<ExecutionPlan, PlanError> {
    let (order, dependents) = topological_order(&steps)?;

    let mut slots: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
    let ordered = order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect();

    Ok(ExecutionPlan {
        steps: ordered,
        dependents,
    })
}

/// Kahn's algorithm over declaration positions.
fn topological_order(
    steps: &[Step],
) -> Result<(Vec<usize>, HashMap<StepId, Vec<StepId>>), PlanError> {
    let mut index: HashMap<&StepId, usize> = HashMap::with_capacity(steps.len());
    for (position, step) in steps.iter().enumerate() {
        if index.insert(&step.id, position).is_some() {
            return Err(PlanError::DuplicateStep(step.id.to_string()));
        }
    }

    for step in steps {
        if let Some(missing) = step.depends_on.iter().find(|dep| !index.contains_key(*dep)) {
            return Err(PlanError::UnknownDependency {
                step: step.id.to_string(),
                dependency: missing.to_string(),
            });
        }
    }

    let mut dependents: HashMap<StepId, Vec<StepId>> = HashMap::new();
    let mut in_degree: Vec<usize> = Vec::with_capacity(steps.len());
    for step in steps {
        in_degree.push(step.depends_on.len());
        for dependency in &step.depends_on {
            dependents
                .entry(dependency.clone())
                .or_default()
                .push(step.id.clone());
        }
    }

    let mut queue: VecDeque<usize> = (0..steps.len())
        .filter(|position| in_degree[*position] == 0)
        .collect();
    let mut order: Vec<usize> = Vec::with_capacity(steps.len());

    while let Some(position) = queue.pop_front() {
        order.push(position);
        let mut unlocked: Vec<usize> = Vec::new();
        for dependent in dependents.get(&steps[position].id).into_iter().flatten() {
            let dependent_position = index[dependent];
            in_degree[dependent_position] -= 1;
            if in_degree[dependent_position] == 0 {
                unlocked.push(dependent_position);
            }
        }
        unlocked.sort_unstable();
        queue.extend(unlocked);
    }

    if order.len() < steps.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        let remaining: Vec<&Step> = steps
            .iter()
            .enumerate()
            .filter(|(position, _)| !placed.contains(position))
            .map(|(_, step)| step)
            .collect();
        return Err(PlanError::Cycle {
            steps: find_cycle(&remaining),
        });
    }

    Ok((order, dependents))
}

/// Restricts a step table to `requested` and everything they depend on.
///
/// Declaration order is preserved.
pub fn plan_subset(steps: Vec<Step>, requested: &[StepId]) -> Result<Vec<Step>, PlanError> {
    let by_id: HashMap<&StepId, &Step> = steps.iter().map(|step| (&step.id, step)).collect();

    let mut selected: HashSet<StepId> = HashSet::new();
    let mut queue: VecDeque<&StepId> = VecDeque::new();
    for id in requested {
        if !by_id.contains_key(id) {
            return Err(PlanError::UnknownStep(id.to_string()));
        }
        queue.push_back(id);
    }

    while let Some(id) = queue.pop_front() {
        if !selected.insert(id.clone()) {
            continue;
        }
        let step = by_id
            .get(id)
            .ok_or_else(|| PlanError::UnknownStep(id.to_string()))?;
        for dependency in &step.depends_on {
            if !by_id.contains_key(dependency) {
                return Err(PlanError::UnknownDependency {
                    step: id.to_string(),
                    dependency: dependency.to_string(),
                });
            }
            queue.push_back(dependency);
        }
    }

    Ok(steps
        .into_iter()
        .filter(|step| selected.contains(&step.id))
        .collect())
}

/// Follows unresolved dependencies among `remaining` until a step repeats.
///
/// Every remaining step still waits on another remaining step, so the walk
/// always closes a loop.
fn find_cycle(remaining: &[&Step]) -> Vec<String> {
    let pending: HashMap<&StepId, &Step> =
        remaining.iter().map(|step| (&step.id, *step)).collect();

    let Some(start) = remaining.first() else {
        return Vec::new();
    };

    let mut path: Vec<&StepId> = Vec::new();
    let mut position_in_path: HashMap<&StepId, usize> = HashMap::new();
    let mut current = &start.id;

    loop {
        if let Some(&first) = position_in_path.get(current) {
            let mut cycle: Vec<String> = path[first..].iter().map(|id| id.to_string()).collect();
            cycle.push(current.to_string());
            return cycle;
        }
        position_in_path.insert(current, path.len());
        path.push(current);

        let next = pending
            .get(current)
            .and_then(|step| step.depends_on.iter().find(|dep| pending.contains_key(dep)));
        match next {
            Some(next) => current = next,
            None => return path.iter().map(|id| id.to_string()).collect(),
        }
    }
}
