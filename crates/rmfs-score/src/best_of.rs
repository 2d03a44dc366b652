//! Lexicographic best-candidate tournament.
//!
//! `BestOf` keeps the incumbent winner and its full score vector.  A
//! challenger is evaluated criterion by criterion: strictly better at some
//! criterion (with all earlier ones tied) takes the lead, strictly worse
//! short-circuits immediately, a tie on every criterion keeps the incumbent
//! (first-seen wins).  Scores for criteria after a strict loss are never
//! computed.

/// Optimization direction for every criterion in the tournament.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Objective {
    Minimize,
    Maximize,
}

impl Objective {
    /// `true` if `a` is strictly better than `b` under this objective.
    #[inline]
    fn better(self, a: f64, b: f64) -> bool {
        match self {
            Objective::Minimize => a < b,
            Objective::Maximize => a > b,
        }
    }
}

/// Multi-criterion lexicographic minimizer (or maximizer) over candidates of
/// type `T`.
pub struct BestOf<T> {
    objective: Objective,
    criteria: usize,
    best: Option<T>,
    best_scores: Vec<f64>,
}

impl<T: Copy> BestOf<T> {
    pub fn new(criteria: usize, objective: Objective) -> Self {
        assert!(criteria > 0, "at least one criterion required");
        Self {
            objective,
            criteria,
            best: None,
            best_scores: Vec::with_capacity(criteria),
        }
    }

    /// Offer a challenger.  `score(i, cand)` evaluates criterion `i`; it is
    /// called lazily and at most once per criterion.  Returns `true` if the
    /// challenger took the lead.
    pub fn reassess<F>(&mut self, cand: T, mut score: F) -> bool
    where
        F: FnMut(usize, T) -> f64,
    {
        if self.best.is_none() {
            self.best_scores = (0..self.criteria).map(|i| score(i, cand)).collect();
            self.best = Some(cand);
            return true;
        }

        for i in 0..self.criteria {
            let s = score(i, cand);
            if self.objective.better(s, self.best_scores[i]) {
                // Criteria before i tied, so the incumbent's values there
                // are also the challenger's; only the rest needs computing.
                self.best_scores[i] = s;
                for j in (i + 1)..self.criteria {
                    self.best_scores[j] = score(j, cand);
                }
                self.best = Some(cand);
                return true;
            }
            if self.objective.better(self.best_scores[i], s) {
                return false;
            }
        }

        // Full tie: first-seen wins.
        false
    }

    /// Reset between selection rounds.
    pub fn recycle(&mut self) {
        self.best = None;
        self.best_scores.clear();
    }

    pub fn best(&self) -> Option<T> {
        self.best
    }

    /// The winning score vector (empty until a candidate was assessed).
    pub fn best_scores(&self) -> &[f64] {
        &self.best_scores
    }
}
