//! DC optimal power flow in PTDF form, solved as an LP with Clarabel.
//!
//! ```text
//! minimize    Σ c_n·g_n + VOLL·Σ s_n
//! subject to  Σ g_n + Σ s_n = Σ d_n                         (λ)
//!             Σ_n PTDF[l,n]·(g_n + s_n − d_n) ≤  limit_l     (upper, per line)
//!            −Σ_n PTDF[l,n]·(g_n + s_n − d_n) ≤  limit_l     (lower, per line)
//!             0 ≤ g_n ≤ capacity_n,  0 ≤ s_n ≤ d_n
//! ```
//!
//! Shedding variables `s_n` exist only when a value of lost load is set.
//!
//! Clarabel's KKT condition is `q + Aᵀz = 0`, so the sensitivity of the optimal
//! cost to a right-hand side is `−z`. Demand at node n enters the balance with
//! coefficient 1 and the line rows with ±PTDF[l,n], which gives
//!
//! ```text
//! λ   = −z_balance
//! μ_l = z_lower·[lower active] − z_upper·[upper active]
//! LMP_n = λ + Σ_l μ_l·PTDF[l,n]
//! ```
//!
//! Interior-point duals sit at the centre of the optimal dual face, so they are
//! only used as-is when the active set cannot pin the prices down. Otherwise λ
//! and μ are recovered exactly from the variables strictly inside their bounds
//! (each prices its node at its own offer) and checked for dual feasibility.
//! With nothing marginal and no line binding, λ is the cost of the next MW in
//! merit order.

use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, IPSolver, SolverStatus, SupportedConeT},
};
use faer::{prelude::*, Mat};
use lmp_core::{Network, NodeId, FLOW_TOLERANCE_MW};
use web_time::Instant;

use super::economic::marginal_cost;
use super::types::{DispatchError, DispatchSolution, InfeasibilityReason, OpfMethod};
use crate::sparse::PtdfMatrix;

/// Balance and capacity comparisons (MW).
const MW_TOLERANCE: f64 = FLOW_TOLERANCE_MW;

/// A variable is at a bound when within `BOUND_TOLERANCE · (1 + upper)` MW of it.
const BOUND_TOLERANCE: f64 = 1e-7;

/// Relative slack allowed in the dual feasibility check of recovered prices.
const PRICE_TOLERANCE: f64 = 1e-6;

/// Clarabel's default stopping tolerance, scaled down for sub-MW limits.
const SOLVER_TOLERANCE: f64 = 1e-8;
const MIN_SOLVER_TOLERANCE: f64 = 1e-10;

/// PTDF entries below this are treated as structural zeros.
const PTDF_ZERO: f64 = 1e-12;

/// Knobs for one dispatch solve.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOptions {
    /// Price of unserved demand; `None` disables load shedding
    pub value_of_lost_load: Option<f64>,
    pub max_iterations: u32,
    /// A line bound counts as active when its slack is within
    /// `binding_tolerance · (1 + limit)` MW
    pub binding_tolerance: f64,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            value_of_lost_load: None,
            max_iterations: 200,
            binding_tolerance: 1e-5,
        }
    }
}

/// Accumulates `Ax + s = b, s ∈ K` column by column.
struct ConicProblem {
    columns: Vec<Vec<(usize, f64)>>,
    rhs: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConicProblem {
    fn new(n_var: usize) -> Self {
        Self {
            columns: vec![Vec::new(); n_var],
            rhs: Vec::new(),
            cones: Vec::new(),
        }
    }

    /// Σ coeff·x = b
    fn push_eq(&mut self, coeffs: &[(usize, f64)], b: f64) -> usize {
        let row = self.push_row(coeffs, b);
        match self.cones.last_mut() {
            Some(SupportedConeT::ZeroConeT(n)) => *n += 1,
            _ => self.cones.push(SupportedConeT::ZeroConeT(1)),
        }
        row
    }

    /// Σ coeff·x ≤ b
    fn push_leq(&mut self, coeffs: &[(usize, f64)], b: f64) -> usize {
        let row = self.push_row(coeffs, b);
        match self.cones.last_mut() {
            Some(SupportedConeT::NonnegativeConeT(n)) => *n += 1,
            _ => self.cones.push(SupportedConeT::NonnegativeConeT(1)),
        }
        row
    }

    fn push_row(&mut self, coeffs: &[(usize, f64)], b: f64) -> usize {
        let row = self.rhs.len();
        for &(col, val) in coeffs {
            self.columns[col].push((row, val));
        }
        self.rhs.push(b);
        row
    }

    /// Constraint matrix in CSC form (entries already in row order per column).
    fn matrix(&self) -> CscMatrix<f64> {
        let mut col_ptr = Vec::with_capacity(self.columns.len() + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for column in &self.columns {
            col_ptr.push(row_idx.len());
            for &(r, v) in column {
                row_idx.push(r);
                values.push(v);
            }
        }
        col_ptr.push(row_idx.len());
        CscMatrix::new(self.rhs.len(), self.columns.len(), col_ptr, row_idx, values)
    }
}

/// Decision variable → node it belongs to.
#[derive(Debug, Clone, Copy)]
enum Var {
    Generation(usize),
    Shedding(usize),
}

impl Var {
    fn node(&self) -> usize {
        match self {
            Var::Generation(n) | Var::Shedding(n) => *n,
        }
    }
}

/// Row indices of one line's limit pair; `None` when the row has no variables.
#[derive(Debug, Clone, Copy, Default)]
struct LineRows {
    upper: Option<usize>,
    lower: Option<usize>,
}

/// Which of a line's limit rows hold with equality at the optimum.
#[derive(Debug, Clone, Copy, Default)]
struct LineActivity {
    upper: bool,
    lower: bool,
}

impl LineActivity {
    fn any(&self) -> bool {
        self.upper || self.lower
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BoundState {
    Lower,
    Interior,
    Upper,
}

fn bound_state(value: f64, upper: f64) -> BoundState {
    let tol = BOUND_TOLERANCE * (1.0 + upper);
    if value <= tol {
        BoundState::Lower
    } else if value >= upper - tol {
        BoundState::Upper
    } else {
        BoundState::Interior
    }
}

/// Stopping tolerance for the interior-point solve.
fn solver_tolerance(network: &Network) -> f64 {
    let smallest_limit = network
        .lines()
        .map(|l| l.capacity_mw)
        .filter(|c| *c > 0.0)
        .fold(1.0, f64::min);
    (SOLVER_TOLERANCE * smallest_limit).max(MIN_SOLVER_TOLERANCE)
}

/// Least-cost dispatch under line limits, with λ and μ from the LP duals.
pub fn dispatch(
    network: &Network,
    ptdf: &PtdfMatrix,
    options: &DispatchOptions,
) -> Result<DispatchSolution, DispatchError> {
    let start = Instant::now();
    let n_nodes = network.node_count();
    let n_lines = network.line_count();
    if ptdf.num_nodes() != n_nodes || ptdf.num_lines() != n_lines {
        return Err(DispatchError::DimensionMismatch(format!(
            "PTDF is {}×{}, network has {} lines and {} nodes",
            ptdf.num_lines(),
            ptdf.num_nodes(),
            n_lines,
            n_nodes
        )));
    }

    let demand = network.demand_vector();
    let total_demand: f64 = demand.iter().sum();
    let total_capacity = network.total_generation_capacity();
    let voll = options.value_of_lost_load;

    if voll.is_none() && total_capacity < total_demand - MW_TOLERANCE {
        tracing::debug!(total_capacity, total_demand, "capacity short of demand");
        return Err(DispatchError::Infeasible(
            InfeasibilityReason::InsufficientCapacity,
        ));
    }

    // Variables: one per generating node, then one per loaded node if shedding is on
    let mut vars: Vec<Var> = network
        .nodes()
        .filter(|n| n.has_generation())
        .map(|n| Var::Generation(n.id.value()))
        .collect();
    if voll.is_some() {
        vars.extend(
            network
                .nodes()
                .filter(|n| n.demand_mw > 0.0)
                .map(|n| Var::Shedding(n.id.value())),
        );
    }

    if vars.is_empty() {
        // Nothing to dispatch; only a zero-demand case is feasible
        return Ok(DispatchSolution {
            method: OpfMethod::DcOpf,
            dispatch: vec![0.0; n_nodes],
            shedding: vec![0.0; n_nodes],
            flows: vec![0.0; n_lines],
            total_cost: 0.0,
            lambda: 0.0,
            mu: vec![0.0; n_lines],
            feasible: true,
            iterations: 0,
            solve_time_ms: start.elapsed().as_millis(),
        });
    }

    let costs: Vec<f64> = vars
        .iter()
        .map(|v| match v {
            Var::Generation(n) => network
                .node(NodeId::new(*n))
                .map(|node| node.offer.cost_per_mwh)
                .unwrap_or(0.0),
            Var::Shedding(_) => voll.unwrap_or(0.0),
        })
        .collect();

    let mut problem = ConicProblem::new(vars.len());

    // Energy balance
    let ones: Vec<(usize, f64)> = (0..vars.len()).map(|k| (k, 1.0)).collect();
    let balance_row = problem.push_eq(&ones, total_demand);

    // Line limits. Flow caused by fixed withdrawals moves to the right-hand side.
    let mut line_rows = vec![LineRows::default(); n_lines];
    for (l, line) in network.lines().enumerate() {
        let row = ptdf.row(l);
        let base: f64 = row.iter().zip(&demand).map(|(f, d)| f * d).sum();
        let coeffs: Vec<(usize, f64)> = vars
            .iter()
            .enumerate()
            .map(|(k, v)| (k, row[v.node()]))
            .filter(|(_, f)| f.abs() > PTDF_ZERO)
            .collect();
        let limit = line.capacity_mw;

        if coeffs.is_empty() {
            // Flow is fixed by demand alone
            if base.abs() > limit + MW_TOLERANCE {
                tracing::debug!(line = %line.name, flow = -base, limit, "fixed flow exceeds limit");
                return Err(DispatchError::Infeasible(
                    InfeasibilityReason::NetworkConstrained,
                ));
            }
            continue;
        }

        let negated: Vec<(usize, f64)> = coeffs.iter().map(|&(k, f)| (k, -f)).collect();
        line_rows[l] = LineRows {
            upper: Some(problem.push_leq(&coeffs, limit + base)),
            lower: Some(problem.push_leq(&negated, limit - base)),
        };
    }

    // Variable bounds
    let mut upper_bounds = Vec::with_capacity(vars.len());
    for (k, v) in vars.iter().enumerate() {
        let ub = match v {
            Var::Generation(n) => network
                .node(NodeId::new(*n))
                .map(|node| node.offer.capacity_mw)
                .unwrap_or(0.0),
            Var::Shedding(n) => demand[*n],
        };
        problem.push_leq(&[(k, 1.0)], ub);
        problem.push_leq(&[(k, -1.0)], 0.0);
        upper_bounds.push(ub);
    }

    tracing::debug!(
        variables = vars.len(),
        rows = problem.rhs.len(),
        total_demand,
        "solving DC-OPF"
    );

    let n_var = vars.len();
    let a_mat = problem.matrix();
    let p_mat = CscMatrix::new(n_var, n_var, vec![0; n_var + 1], vec![], vec![]);

    let tol = solver_tolerance(network);
    let settings = DefaultSettingsBuilder::default()
        .verbose(false)
        .max_iter(options.max_iterations)
        .tol_feas(tol)
        .tol_gap_abs(tol)
        .tol_gap_rel(tol)
        .build()
        .map_err(|e| DispatchError::Numerical(format!("Clarabel settings error: {:?}", e)))?;

    let mut solver = clarabel::solver::DefaultSolver::new(
        &p_mat,
        &costs,
        &a_mat,
        &problem.rhs,
        &problem.cones,
        settings,
    )
    .map_err(|e| DispatchError::Numerical(format!("Clarabel initialization failed: {:?}", e)))?;

    solver.solve();
    let sol = solver.solution;

    match sol.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => {}
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            tracing::debug!(status = ?sol.status, "line limits leave no feasible dispatch");
            return Err(DispatchError::Infeasible(
                InfeasibilityReason::NetworkConstrained,
            ));
        }
        status => {
            return Err(DispatchError::Numerical(format!(
                "Clarabel returned status {:?}",
                status
            )));
        }
    }

    // Clamp interior-point noise back onto the bounds
    let mut dispatch = vec![0.0; n_nodes];
    let mut shedding = vec![0.0; n_nodes];
    let mut values = Vec::with_capacity(vars.len());
    let mut total_cost = 0.0;
    for (k, v) in vars.iter().enumerate() {
        let value = sol.x[k].clamp(0.0, upper_bounds[k]);
        values.push(value);
        total_cost += costs[k] * value;
        match v {
            Var::Generation(n) => dispatch[*n] = value,
            Var::Shedding(n) => shedding[*n] = value,
        }
    }

    let injections: Vec<f64> = (0..n_nodes)
        .map(|n| dispatch[n] + shedding[n] - demand[n])
        .collect();
    let flows = ptdf.flows(&injections);

    let activity: Vec<LineActivity> = network
        .lines()
        .zip(&line_rows)
        .zip(&flows)
        .map(|((line, rows), &flow)| {
            let tol = options.binding_tolerance * (1.0 + line.capacity_mw);
            LineActivity {
                upper: rows.upper.is_some() && line.capacity_mw - flow <= tol,
                lower: rows.lower.is_some() && line.capacity_mw + flow <= tol,
            }
        })
        .collect();

    let bounds = VariableBounds {
        vars: &vars,
        values: &values,
        upper: &upper_bounds,
        costs: &costs,
    };
    let (lambda, mu) = match vertex_prices(&bounds, ptdf, &activity) {
        Some(prices) => prices,
        None if !activity.iter().any(LineActivity::any) => {
            let lambda = next_mw_price(network, &dispatch, &shedding, voll);
            tracing::debug!(lambda, "no marginal unit, pricing the next MW in merit order");
            (lambda, vec![0.0; n_lines])
        }
        None => {
            tracing::debug!("active set leaves prices undetermined, keeping solver duals");
            let lambda = -sol.z[balance_row];
            let mu: Vec<f64> = line_rows
                .iter()
                .zip(&activity)
                .map(|(rows, active)| {
                    let z_upper = rows.upper.map(|r| sol.z[r]).unwrap_or(0.0);
                    let z_lower = rows.lower.map(|r| sol.z[r]).unwrap_or(0.0);
                    let mut mu = 0.0;
                    if active.lower {
                        mu += z_lower;
                    }
                    if active.upper {
                        mu -= z_upper;
                    }
                    mu
                })
                .collect();
            (lambda, mu)
        }
    };

    tracing::debug!(
        total_cost,
        lambda,
        binding = mu.iter().filter(|m| **m != 0.0).count(),
        iterations = sol.iterations,
        "DC-OPF solved"
    );

    Ok(DispatchSolution {
        method: OpfMethod::DcOpf,
        dispatch,
        shedding,
        flows,
        total_cost,
        lambda,
        mu,
        feasible: true,
        iterations: sol.iterations as usize,
        solve_time_ms: start.elapsed().as_millis(),
    })
}

/// Optimal primal values alongside their bounds and costs.
struct VariableBounds<'a> {
    vars: &'a [Var],
    values: &'a [f64],
    upper: &'a [f64],
    costs: &'a [f64],
}

impl VariableBounds<'_> {
    fn state(&self, k: usize) -> BoundState {
        bound_state(self.values[k], self.upper[k])
    }
}

/// Exact λ and μ from the active set.
///
/// Unknowns are λ plus one μ per active line; every interior variable gives
/// `cost = λ + Σ μ_l·PTDF[l, node]`. The system is solved in the least-squares
/// sense and accepted only when it reproduces every interior cost and the
/// resulting prices are dual feasible for the bound variables and line signs.
fn vertex_prices(
    bounds: &VariableBounds<'_>,
    ptdf: &PtdfMatrix,
    activity: &[LineActivity],
) -> Option<(f64, Vec<f64>)> {
    let priced: Vec<usize> = (0..activity.len()).filter(|&l| activity[l].any()).collect();
    let unknowns = 1 + priced.len();
    let interior: Vec<usize> = (0..bounds.vars.len())
        .filter(|&k| bounds.state(k) == BoundState::Interior)
        .collect();
    if interior.len() < unknowns {
        return None;
    }

    let coeff = |k: usize, j: usize| {
        if j == 0 {
            1.0
        } else {
            ptdf.get_by_idx(priced[j - 1], bounds.vars[k].node())
        }
    };
    let normal = Mat::from_fn(unknowns, unknowns, |i, j| {
        interior.iter().map(|&k| coeff(k, i) * coeff(k, j)).sum::<f64>()
    });
    let rhs = Mat::from_fn(unknowns, 1, |i, _| {
        interior.iter().map(|&k| coeff(k, i) * bounds.costs[k]).sum::<f64>()
    });
    let x = normal.partial_piv_lu().solve(&rhs);
    let solution: Vec<f64> = (0..unknowns).map(|i| x.read(i, 0)).collect();
    if solution.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let lambda = solution[0];
    let mut mu = vec![0.0; activity.len()];
    for (j, &l) in priced.iter().enumerate() {
        mu[l] = solution[j + 1];
    }
    let lmp = |n: usize| -> f64 {
        lambda
            + priced
                .iter()
                .map(|&l| mu[l] * ptdf.get_by_idx(l, n))
                .sum::<f64>()
    };

    let scale = 1.0 + bounds.costs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    let tol = PRICE_TOLERANCE * scale;
    for (k, var) in bounds.vars.iter().enumerate() {
        let price = lmp(var.node());
        let cost = bounds.costs[k];
        let feasible = match bounds.state(k) {
            BoundState::Interior => (cost - price).abs() <= tol,
            BoundState::Lower => cost >= price - tol,
            BoundState::Upper => cost <= price + tol,
        };
        if !feasible {
            return None;
        }
    }
    // Pinned at +limit prices negative, at −limit positive
    for &l in &priced {
        let active = activity[l];
        if active.upper && !active.lower && mu[l] > tol {
            return None;
        }
        if active.lower && !active.upper && mu[l] < -tol {
            return None;
        }
    }
    Some((lambda, mu))
}

/// λ when every unit sits at a bound and no line binds.
fn next_mw_price(network: &Network, dispatch: &[f64], shedding: &[f64], voll: Option<f64>) -> f64 {
    if let Some(voll) = voll {
        if shedding.iter().any(|s| *s > MW_TOLERANCE) {
            return voll;
        }
    }
    let capacities: Vec<f64> = network.nodes().map(|n| n.offer.capacity_mw).collect();
    let costs: Vec<f64> = network.nodes().map(|n| n.offer.cost_per_mwh).collect();
    marginal_cost(dispatch, &capacities, &costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::NetworkModel;
    use crate::test_utils::{three_node_uncongested, two_node_congested};
    use lmp_core::{LineId, Offer};

    fn solve(network: &Network, options: &DispatchOptions) -> Result<DispatchSolution, DispatchError> {
        let model = NetworkModel::build(network, network.slack()).unwrap();
        dispatch(network, model.ptdf(), options)
    }

    #[test]
    fn test_uncongested_merit_order() {
        let network = three_node_uncongested();
        let solution = solve(&network, &DispatchOptions::default()).unwrap();

        assert!((solution.dispatch[0] - 60.0).abs() < 1e-4);
        assert!((solution.dispatch[1] - 40.0).abs() < 1e-4);
        assert!(solution.dispatch[2].abs() < 1e-4);
        assert!((solution.total_cost - (600.0 + 800.0)).abs() < 1e-3);
        assert!((solution.lambda - 20.0).abs() < 1e-4);
        assert!(solution.mu.iter().all(|m| *m == 0.0));
    }

    #[test]
    fn test_congested_line_pinned() {
        let network = two_node_congested();
        let solution = solve(&network, &DispatchOptions::default()).unwrap();

        // Slack A: flow A→B at the 100 MW limit
        assert!((solution.flows[0] - 100.0).abs() < 1e-4);
        assert!((solution.dispatch[0] - 100.0).abs() < 1e-4);
        assert!((solution.dispatch[1] - 50.0).abs() < 1e-4);
        assert!((solution.lambda - 10.0).abs() < 1e-4);
        // Pinned at +limit in the reference direction: negative μ
        assert!((solution.mu[0] + 40.0).abs() < 1e-3);
        assert_eq!(solution.binding_lines(), vec![LineId::new(0)]);
    }

    #[test]
    fn test_insufficient_capacity() {
        let mut network = two_node_congested();
        network.set_demand(NodeId::new(1), 2000.0).unwrap();
        let err = solve(&network, &DispatchOptions::default()).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Infeasible(InfeasibilityReason::InsufficientCapacity)
        );
    }

    #[test]
    fn test_network_constrained() {
        // Only A generates; B's load exceeds the line limit
        let mut network = two_node_congested();
        network.set_generation(NodeId::new(1), 0.0, 0.0).unwrap();
        let err = solve(&network, &DispatchOptions::default()).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Infeasible(InfeasibilityReason::NetworkConstrained)
        );
    }

    #[test]
    fn test_voll_sheds_instead_of_failing() {
        let mut network = two_node_congested();
        network.set_generation(NodeId::new(1), 0.0, 0.0).unwrap();
        let options = DispatchOptions {
            value_of_lost_load: Some(1000.0),
            ..Default::default()
        };
        let solution = solve(&network, &options).unwrap();
        assert!((solution.dispatch[0] - 100.0).abs() < 1e-4);
        assert!((solution.shedding[1] - 50.0).abs() < 1e-4);
        assert!((solution.total_cost - (1000.0 + 50_000.0)).abs() < 1e-2);
    }

    #[test]
    fn test_no_generation_zero_demand() {
        let mut network = Network::new();
        let a = network.add_node("A", Offer::none(), 0.0);
        let b = network.add_node("B", Offer::none(), 0.0);
        network.add_line(a, b, 0.1, 10.0).unwrap();
        let solution = solve(&network, &DispatchOptions::default()).unwrap();
        assert_eq!(solution.total_cost, 0.0);
        assert_eq!(solution.lambda, 0.0);
    }

    #[test]
    fn test_zero_demand_priced_at_cheapest_offer() {
        let mut network = three_node_uncongested();
        for n in 0..3 {
            network.set_demand(NodeId::new(n), 0.0).unwrap();
        }
        let solution = solve(&network, &DispatchOptions::default()).unwrap();
        assert!(solution.total_cost.abs() < 1e-4);
        assert!((solution.lambda - 10.0).abs() < 1e-9);
        assert!(solution.mu.iter().all(|m| *m == 0.0));

        let mut network = two_node_congested();
        network.set_demand(NodeId::new(1), 0.0).unwrap();
        let solution = solve(&network, &DispatchOptions::default()).unwrap();
        assert!((solution.lambda - 10.0).abs() < 1e-9);
        assert_eq!(solution.mu, vec![0.0]);
    }

    #[test]
    fn test_tiny_limit_prices_match_offers() {
        let mut network = two_node_congested();
        network.set_line_capacity(LineId::new(0), 1e-4).unwrap();
        let solution = solve(&network, &DispatchOptions::default()).unwrap();

        assert!((solution.flows[0] - 1e-4).abs() < 1e-6);
        assert!((solution.lambda - 10.0).abs() < 1e-6);
        assert!((solution.mu[0] + 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_recovered_duals_are_exact() {
        let solution = solve(&two_node_congested(), &DispatchOptions::default()).unwrap();
        assert!((solution.lambda - 10.0).abs() < 1e-9);
        assert!((solution.mu[0] + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_bound_state() {
        assert_eq!(bound_state(0.0, 100.0), BoundState::Lower);
        assert_eq!(bound_state(1e-4, 500.0), BoundState::Interior);
        assert_eq!(bound_state(100.0 - 1e-9, 100.0), BoundState::Upper);
    }

    #[test]
    fn test_solver_tolerance_follows_smallest_limit() {
        let mut network = two_node_congested();
        assert_eq!(solver_tolerance(&network), SOLVER_TOLERANCE);
        network.set_line_capacity(LineId::new(0), 0.01).unwrap();
        assert!((solver_tolerance(&network) - 1e-10).abs() < 1e-20);
        network.set_line_capacity(LineId::new(0), 0.0).unwrap();
        assert_eq!(solver_tolerance(&network), SOLVER_TOLERANCE);
    }

    #[test]
    fn test_dimension_mismatch() {
        let network = two_node_congested();
        let model = NetworkModel::build(&network, NodeId::new(0)).unwrap();
        let mut bigger = network.clone();
        bigger.add_node("C", Offer::none(), 0.0);
        let err = dispatch(&bigger, model.ptdf(), &DispatchOptions::default()).unwrap_err();
        assert!(matches!(err, DispatchError::DimensionMismatch(_)));
    }
}
