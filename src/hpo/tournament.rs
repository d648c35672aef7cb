//! Tournament selection over a ranked population
//!
//! Members are ranked by recency-weighted fitness (the mean of each member's
//! most recent `eval_loop` evaluation scores). With elitism enabled the top
//! member is cloned unmodified into slot 0 of the next generation; every
//! other slot is filled by the winner of a small uniform-with-replacement
//! tournament. The output always holds exactly N deep clones, and ties break
//! toward the earlier original index so selection is deterministic under a
//! fixed seed.

use rand::rngs::StdRng;
use rand::Rng;

use crate::agent::EvolvableAgent;
use crate::error::EvolveError;

/// Tournament selector producing the next generation
#[derive(Debug, Clone)]
pub struct TournamentSelection {
    tournament_size: usize,
    elitism: bool,
    population_size: usize,
    eval_loop: usize,
}

impl TournamentSelection {
    /// Create a validated selector
    pub fn new(
        tournament_size: usize,
        elitism: bool,
        population_size: usize,
        eval_loop: usize,
    ) -> Result<Self, EvolveError> {
        if population_size == 0 {
            return Err(EvolveError::Configuration(
                "population size must be positive".into(),
            ));
        }
        if tournament_size == 0 {
            return Err(EvolveError::Configuration(
                "tournament size must be positive".into(),
            ));
        }
        if eval_loop == 0 {
            return Err(EvolveError::Configuration(
                "evaluation window must be positive".into(),
            ));
        }
        Ok(Self { tournament_size, elitism, population_size, eval_loop })
    }

    /// Whether the top member survives unmodified into the next generation
    pub fn elitism(&self) -> bool {
        self.elitism
    }

    /// Fixed population size N
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Recency-weighted fitness: mean of the most recent `eval_loop` scores
    ///
    /// Members with no evaluations yet rank below every evaluated member.
    fn recent_fitness<A: EvolvableAgent>(&self, agent: &A) -> f64 {
        let fitness = &agent.state().fitness;
        if fitness.is_empty() {
            return f64::NEG_INFINITY;
        }
        let window = &fitness[fitness.len().saturating_sub(self.eval_loop)..];
        window.iter().sum::<f64>() / window.len() as f64
    }

    /// Select the next generation from the current population
    ///
    /// Returns a clone of the elite member and the full next generation.
    /// The same underlying member may win multiple slots; each winner is an
    /// independent deep clone with its slot index reassigned.
    pub fn select<A: EvolvableAgent>(
        &self,
        population: &[A],
        rng: &mut StdRng,
    ) -> Result<(A, Vec<A>), EvolveError> {
        if population.len() != self.population_size {
            return Err(EvolveError::Configuration(format!(
                "population holds {} members, selector configured for {}",
                population.len(),
                self.population_size
            )));
        }

        let fitnesses: Vec<f64> = population.iter().map(|a| self.recent_fitness(a)).collect();

        // Earlier index wins ties.
        let mut best = 0;
        for (idx, &fitness) in fitnesses.iter().enumerate() {
            if fitness > fitnesses[best] {
                best = idx;
            }
        }
        let elite = population[best].clone();

        let mut next_generation = Vec::with_capacity(self.population_size);
        if self.elitism {
            next_generation.push(elite.clone());
        }

        while next_generation.len() < self.population_size {
            let mut winner = rng.gen_range(0..population.len());
            for _ in 1..self.tournament_size {
                let challenger = rng.gen_range(0..population.len());
                if fitnesses[challenger] > fitnesses[winner]
                    || (fitnesses[challenger] == fitnesses[winner] && challenger < winner)
                {
                    winner = challenger;
                }
            }
            next_generation.push(population[winner].clone());
        }

        for (slot, agent) in next_generation.iter_mut().enumerate() {
            agent.state_mut().index = slot;
        }
        Ok((elite, next_generation))
    }
}
