use tracing::warn;

/// Outcome of a fixed-point iteration. A non-converged result is still
/// usable for design purposes (near-convergence is typical when the cap is
/// hit), so the last iterate is always returned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FixedPointResult {
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Iterate `x_next = f(x)` from `initial` until the relative change drops
/// below `rel_tol` or `max_iter` passes have run.
///
/// The published ASHRAE 152 duct method and the psychrometric inverse
/// solves are all stated as fixed-point schemes, so the hand-rolled loop is
/// kept, but the convergence bookkeeping (and the warning on hitting the
/// iteration cap) lives here once rather than at every call site.
pub(crate) fn fixed_point_iterate(
    mut f: impl FnMut(f64) -> f64,
    initial: f64,
    rel_tol: f64,
    max_iter: usize,
    label: &str,
) -> FixedPointResult {
    let mut x = initial;
    for iteration in 1..=max_iter {
        let x_next = f(x);
        let delta = if x != 0. {
            ((x_next - x) / x).abs()
        } else {
            x_next.abs()
        };
        x = x_next;
        if delta <= rel_tol {
            return FixedPointResult {
                value: x,
                converged: true,
                iterations: iteration,
            };
        }
    }
    warn!("{label} iteration did not converge within {max_iter} passes; using last iterate");
    FixedPointResult {
        value: x,
        converged: false,
        iterations: max_iter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn should_converge_on_contraction_mapping() {
        // x = cos(x) has the Dottie fixed point at 0.739085...
        let result = fixed_point_iterate(|x| x.cos(), 1.0, 1e-9, 200, "test");
        assert!(result.converged);
        assert_relative_eq!(result.value, 0.7390851332151607, max_relative = 1e-6);
    }

    #[rstest]
    fn should_return_last_iterate_when_cap_hit() {
        let result = fixed_point_iterate(|x| x.cos(), 1.0, 1e-12, 3, "test");
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert!(result.value.is_finite());
    }

    #[rstest]
    fn should_converge_immediately_at_fixed_point() {
        let result = fixed_point_iterate(|x| x, 5.0, 1e-3, 20, "test");
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.value, 5.0);
    }
}
