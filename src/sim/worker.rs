//! Worker phase of the scheduler step
//!
//! Advances the actor's current task: progress delta from the task's
//! progressor, then the task's per-tick effects, then completion when
//! the bar fills. A worker pointing at a vanished task silently drops it.

use crate::core::types::EntityId;
use crate::effect::Effect;
use crate::event::Event;
use crate::executor::EffectContext;
use crate::model::WorldState;
use tracing::{debug, warn};

use super::manager::SimulationContext;

pub fn worker_tick(
    world: &mut WorldState,
    ctx: &SimulationContext<'_>,
    actor_id: &EntityId,
    ticks: u64,
    events: &mut Vec<Event>,
) {
    let Some(task_id) = world
        .entity(actor_id)
        .and_then(|e| e.worker())
        .and_then(|w| w.current_task_id.clone())
    else {
        return;
    };

    let Some(task) = world.task(&task_id) else {
        warn!(actor = %actor_id, task = %task_id, "worker held a vanished task");
        if let Some(worker) = world.entity_mut(actor_id).and_then(|e| e.worker_mut()) {
            worker.stop_task();
        }
        return;
    };

    let progressor = ctx.progressors.get(&task.progressor_id);
    let delta = progressor.compute_progress_delta(world, actor_id, task, ticks);
    let tick_effects = task.tick_effects.clone();
    let target_id = task.target_entity_id.clone();

    let mut effect_ctx = EffectContext::for_actor(actor_id)
        .with_id("target", target_id)
        .with_task(task_id.clone());

    events.extend(ctx.execute(
        world,
        &Effect::ProgressTask {
            task_id: Some(task_id.clone()),
            delta,
        },
        &mut effect_ctx,
    ));

    for raw in &tick_effects {
        let effect = Effect::from_value(raw);
        events.extend(ctx.execute(world, &effect, &mut effect_ctx));
    }

    let complete = world.task(&task_id).map(|t| t.is_complete()).unwrap_or(false);
    if complete {
        debug!(actor = %actor_id, task = %task_id, "task complete");
        events.extend(ctx.execute(world, &Effect::FinishTask, &mut effect_ctx));
        if let Some(worker) = world.entity_mut(actor_id).and_then(|e| e.worker_mut()) {
            worker.stop_task();
        }
    }
}
