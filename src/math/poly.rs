//! Closed-form real-root solvers for low-degree polynomials
//!
//! Used by the HolonomicBlend PTG to find collision times: the in-ramp
//! obstacle equation is a quartic in t, degenerating to a cubic or a
//! quadratic when the blend coefficients vanish.

const EPS: f64 = 1e-12;

/// Both real roots of `a*x^2 + b*x + c = 0`.
///
/// Returns `None` when the equation is not a proper quadratic (`a ~ 0`) or
/// the discriminant is negative.
pub fn solve_poly2(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    if a.abs() < EPS {
        return None;
    }
    let discr = b * b - 4.0 * a * c;
    if discr < 0.0 {
        return None;
    }
    let sq = discr.sqrt();
    Some(((-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)))
}

/// Real roots of the monic cubic `x^3 + a*x^2 + b*x + c = 0` (Cardano /
/// trigonometric method).
pub fn solve_poly3(a: f64, b: f64, c: f64) -> Vec<f64> {
    // Depressed cubic t^3 + p*t + q via x = t - a/3
    let p = b - a * a / 3.0;
    let q = 2.0 * a * a * a / 27.0 - a * b / 3.0 + c;
    let shift = a / 3.0;

    let discr = (q / 2.0).powi(2) + (p / 3.0).powi(3);

    let mut roots = Vec::with_capacity(3);
    if discr > EPS {
        let sq = discr.sqrt();
        let t = (-q / 2.0 + sq).cbrt() + (-q / 2.0 - sq).cbrt();
        roots.push(t - shift);
    } else if discr < -EPS {
        // Three distinct real roots
        let m = 2.0 * (-p / 3.0).sqrt();
        let arg = (3.0 * q / (2.0 * p)) * (-3.0 / p).sqrt();
        let theta = arg.clamp(-1.0, 1.0).acos();
        for k in 0..3 {
            let t = m * ((theta - 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos();
            roots.push(t - shift);
        }
    } else {
        // Repeated roots
        let u = (-q / 2.0).cbrt();
        roots.push(2.0 * u - shift);
        roots.push(-u - shift);
    }
    roots
}

/// Real roots of the monic quartic `x^4 + a*x^3 + b*x^2 + c*x + d = 0`
/// (Ferrari's method via the resolvent cubic).
pub fn solve_poly4(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    // Depressed quartic y^4 + p*y^2 + q*y + r via x = y - a/4
    let p = b - 3.0 * a * a / 8.0;
    let q = c - a * b / 2.0 + a * a * a / 8.0;
    let r = d - a * c / 4.0 + a * a * b / 16.0 - 3.0 * a.powi(4) / 256.0;
    let shift = a / 4.0;

    let mut roots = Vec::with_capacity(4);

    if q.abs() < EPS {
        // Biquadratic: z^2 + p*z + r = 0 with z = y^2
        let discr = p * p - 4.0 * r;
        if discr >= 0.0 {
            let sq = discr.sqrt();
            for z in [(-p + sq) / 2.0, (-p - sq) / 2.0] {
                if z >= 0.0 {
                    let y = z.sqrt();
                    roots.push(y - shift);
                    if y > EPS {
                        roots.push(-y - shift);
                    }
                }
            }
        }
        return roots;
    }

    // Resolvent cubic z^3 + 2p*z^2 + (p^2 - 4r)*z - q^2 = 0.
    // Its value at z=0 is -q^2 < 0, so the largest real root is positive.
    let z0 = solve_poly3(2.0 * p, p * p - 4.0 * r, -q * q)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    if !z0.is_finite() || z0 <= EPS {
        return roots;
    }

    // Factor y^4 + p y^2 + q y + r = (y^2 + m y + s)(y^2 - m y + t)
    let m = z0.sqrt();
    let s = (p + z0 - q / m) / 2.0;
    let t = (p + z0 + q / m) / 2.0;

    if let Some((r1, r2)) = solve_poly2(1.0, m, s) {
        roots.push(r1 - shift);
        roots.push(r2 - shift);
    }
    if let Some((r1, r2)) = solve_poly2(1.0, -m, t) {
        roots.push(r1 - shift);
        roots.push(r2 - shift);
    }
    roots
}
