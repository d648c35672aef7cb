//! Off-policy population trainer
//!
//! One evolution cycle runs four phases in order: every member rolls out
//! against the vectorized pool and feeds the shared replay buffer, learning
//! from sampled minibatches on its own `learn_step` cadence; every member is
//! evaluated greedily on a standalone environment; stop conditions are
//! checked; and finally tournament selection plus mutation produce the next
//! generation. The returned population is the last evaluated one, never a
//! freshly mutated generation that no score describes.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::agent::EvolvableAgent;
use crate::buffer::{ReplayBuffer, Transition};
use crate::env::{EnvPool, Environment};
use crate::error::EvolveError;
use crate::hpo::mutation::Mutations;
use crate::hpo::tournament::TournamentSelection;
use crate::train::TrainConfig;

/// Train a population with tournament selection and mutation
///
/// Runs evolution cycles until a member exhausts `config.max_steps`
/// environment steps or the best mean evaluation score reaches
/// `config.target`. Returns the final evaluated population together with
/// the per-cycle fitness of every member.
pub fn train_off_policy<A, E>(
    pool: &mut EnvPool<E>,
    eval_env: &mut E,
    mut population: Vec<A>,
    memory: &ReplayBuffer,
    tournament: &TournamentSelection,
    mutations: &Mutations,
    config: &TrainConfig,
) -> anyhow::Result<(Vec<A>, Vec<Vec<f64>>)>
where
    A: EvolvableAgent,
    E: Environment,
{
    config.validate()?;
    if population.is_empty() {
        return Err(EvolveError::Configuration("population is empty".into()).into());
    }
    if population.len() != tournament.population_size() {
        return Err(EvolveError::Configuration(format!(
            "population holds {} members, selector configured for {}",
            population.len(),
            tournament.population_size()
        ))
        .into());
    }
    if pool.num_envs() != config.num_envs {
        return Err(EvolveError::Configuration(format!(
            "pool has {} environments, config expects {}",
            pool.num_envs(),
            config.num_envs
        ))
        .into());
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut epsilon = config.eps_start;
    let mut fitness_history: Vec<Vec<f64>> = Vec::new();

    let num_envs = config.num_envs;
    let steps_per_cycle = (config.evo_steps / num_envs).max(1);

    for cycle in 0.. {
        for agent in population.iter_mut() {
            epsilon = rollout(agent, pool, memory, epsilon, steps_per_cycle, config, &mut rng)?;
        }

        let mut cycle_fitness = Vec::with_capacity(population.len());
        for agent in population.iter_mut() {
            agent.set_training_mode(false);
            let score = agent.test(eval_env, config.eval_steps, config.eval_loop, &mut rng);
            agent.set_training_mode(true);
            agent.state_mut().fitness.push(score);
            cycle_fitness.push(score);
        }

        let best = cycle_fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = cycle_fitness.iter().sum::<f64>() / cycle_fitness.len() as f64;
        let steps = population
            .iter()
            .map(|a| a.state().total_steps())
            .max()
            .unwrap_or(0);
        info!(
            cycle,
            steps,
            best_fitness = best,
            mean_fitness = mean,
            epsilon,
            buffer_len = memory.len(),
            "evolution cycle complete"
        );
        fitness_history.push(cycle_fitness);

        if let Some(target) = config.target {
            if best >= target {
                info!(cycle, best_fitness = best, target, "score target reached");
                break;
            }
        }
        if steps >= config.max_steps {
            info!(cycle, steps, "step budget exhausted");
            break;
        }

        let (_elite, next_generation) = tournament.select(&population, &mut rng)?;
        population = mutations.mutation(next_generation, tournament.elitism(), &mut rng);
    }

    Ok((population, fitness_history))
}

/// Roll out one member for a cycle, learning on its own cadence
///
/// Returns the decayed epsilon so the schedule continues across members and
/// cycles.
fn rollout<A, E>(
    agent: &mut A,
    pool: &mut EnvPool<E>,
    memory: &ReplayBuffer,
    mut epsilon: f64,
    steps_per_cycle: usize,
    config: &TrainConfig,
    rng: &mut StdRng,
) -> anyhow::Result<f64>
where
    A: EvolvableAgent,
    E: Environment,
{
    let num_envs = pool.num_envs();
    let mut observations = pool.reset();
    let mut episode_returns = vec![0.0f64; num_envs];
    let mut learn_count = 0u32;

    for idx_step in 0..steps_per_cycle {
        let actions: Vec<i64> = observations
            .iter()
            .map(|obs| agent.get_action(obs, epsilon, rng))
            .collect();
        let results = pool.step(&actions);

        let mut transitions = Vec::with_capacity(num_envs);
        for (slot, result) in results.into_iter().enumerate() {
            transitions.push(Transition {
                observation: std::mem::take(&mut observations[slot]),
                action: actions[slot],
                reward: result.reward,
                next_observation: result.observation.clone(),
                done: result.terminated,
            });

            episode_returns[slot] += f64::from(result.reward);
            if result.done() {
                agent.state_mut().scores.push(episode_returns[slot]);
                episode_returns[slot] = 0.0;
                observations[slot] = pool.reset_env(slot);
            } else {
                observations[slot] = result.observation;
            }
        }
        memory.add(transitions);
        epsilon = (epsilon * config.eps_decay).max(config.eps_end);

        let batch_size = agent.state().batch_size;
        let ready = memory.counter() >= config.learning_delay && memory.len() >= batch_size;
        if ready {
            // learn_step counts environment steps, and each vectorized step
            // covers num_envs of them: slow cadences learn every few steps,
            // fast cadences learn several times per step.
            let learn_step = agent.state().learn_step.max(1);
            let learn_iterations = if learn_step >= num_envs {
                let interval = (learn_step / num_envs).max(1);
                usize::from(idx_step % interval == 0)
            } else {
                num_envs / learn_step
            };
            for _ in 0..learn_iterations {
                let batch = memory.sample(batch_size, rng)?;
                agent.learn(&batch)?;
                learn_count += 1;
            }
        }
    }

    let total = agent.state().total_steps() + (steps_per_cycle * num_envs) as u64;
    agent.state_mut().steps.push(total);
    debug!(
        index = agent.state().index,
        total_steps = total,
        learn_count,
        epsilon,
        "member rollout complete"
    );
    Ok(epsilon)
}
