//! Outlier Variance Model
//!
//! Estimates how much of a block standard deviation could be explained by a
//! few outlier actions hiding inside each block.
//!
//! Each block of `a` actions is modelled as `a - c` "good" actions drawn from
//! a Gaussian `(μ_G, σ_G)` plus `c` equal-valued outliers. Given the measured
//! block mean and sd, the model finds the largest `c` consistent with the data
//! and the smallest share of the block variance those outliers must carry. A
//! large share means the block sd mostly measures outliers, not the task.

/// Actions per block below which the model is not applied
pub const MIN_ACTIONS: f64 = 16.0;

/// How strongly outliers inflate the measured variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutlierEffect {
    /// At most 1% of the variance
    Unaffected,
    /// Above 1%
    Slight,
    /// Above 10%
    Moderate,
    /// Above 50%
    Severe,
}

impl OutlierEffect {
    /// Classify a variance fraction
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction <= 0.01 {
            OutlierEffect::Unaffected
        } else if fraction <= 0.1 {
            OutlierEffect::Slight
        } else if fraction <= 0.5 {
            OutlierEffect::Moderate
        } else {
            OutlierEffect::Severe
        }
    }

    /// Qualifier used in diagnostics ("possibly", "likely", "almost certainly")
    pub fn qualifier(self) -> &'static str {
        match self {
            OutlierEffect::Unaffected => "not",
            OutlierEffect::Slight => "possibly",
            OutlierEffect::Moderate => "likely",
            OutlierEffect::Severe => "almost certainly",
        }
    }
}

/// Solved model parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierVariance {
    /// Actions per block
    pub a: f64,
    /// Block mean
    pub mu_b: f64,
    /// Block sd
    pub sigma_b: f64,
    /// Action mean `μ_B / a`
    pub mu_a: f64,
    /// Action sd `σ_B / √a`
    pub sigma_a: f64,
    /// Smallest admissible good-action mean `μ_A / 2`
    pub mu_g_min: f64,
    /// Good-action sd `min(μ_G,min / 4, σ_A)`
    pub sigma_g: f64,
    /// Largest outlier count consistent with the model
    pub c_max: f64,
    /// Outlier count realising the minimum outlier variance
    pub c_out_min: f64,
    /// Minimum variance carried by outliers
    pub var_out_min: f64,
    /// Good-action mean at the minimum
    pub mu_g_out_min: f64,
    /// Outlier value at the minimum
    pub u_out_min: f64,
    /// `var_out_min / σ_B²`
    pub fraction: f64,
    /// Classification of `fraction`
    pub effect: OutlierEffect,
}

/// Solve the model for a block mean/sd and `a` actions per block.
///
/// Returns `None` when `a < 16`, when the block sd is zero, or when the inputs
/// are not finite and positive.
pub fn outlier_variance(mu_b: f64, sigma_b: f64, a: f64) -> Option<OutlierVariance> {
    if !a.is_finite() || a < MIN_ACTIONS {
        return None;
    }
    if !(mu_b > 0.0 && mu_b.is_finite() && sigma_b > 0.0 && sigma_b.is_finite()) {
        return None;
    }

    let var_b = sigma_b * sigma_b;
    let mu_a = mu_b / a;
    let sigma_a = sigma_b / a.sqrt();
    let mu_g_min = mu_a / 2.0;
    let sigma_g = (mu_g_min / 4.0).min(sigma_a);
    let var_g = sigma_g * sigma_g;

    let c_max_at = |x: f64| -> Option<f64> {
        let d = (mu_a - x).powi(2);
        let ad = a * d;
        let k1 = var_b - a * var_g + ad;
        let k0 = -a * ad;
        let det = k1 * k1 - 4.0 * var_g * k0;
        let c = (-2.0 * k0 / (k1 + det.sqrt())).floor();
        c.is_finite().then_some(c.clamp(0.0, a))
    };
    let var_out = |c: f64| {
        let ac = a - c;
        (ac / a) * (var_b - ac * var_g)
    };

    let c_max = match (c_max_at(0.0), c_max_at(mu_g_min)) {
        (Some(x), Some(y)) => x.min(y),
        (Some(x), None) | (None, Some(x)) => x,
        (None, None) => 1.0,
    };

    let var_1 = var_out(1.0);
    let var_c = var_out(c_max);
    let (c_out_min, var_out_min) = if var_1 <= var_c {
        (1.0, var_1.max(0.0))
    } else {
        (c_max, var_c.max(0.0))
    };

    let var_good = (var_b - var_out_min).max(0.0);
    let mu_g_out_min = if c_out_min < a {
        mu_a - ((c_out_min * var_good) / (a * (a - c_out_min))).sqrt()
    } else {
        mu_a
    };
    let u_out_min = if c_out_min > 0.0 {
        mu_a + (((a - c_out_min) * var_good) / (a * c_out_min)).sqrt()
    } else {
        mu_a
    };

    let fraction = var_out_min / var_b;

    Some(OutlierVariance {
        a,
        mu_b,
        sigma_b,
        mu_a,
        sigma_a,
        mu_g_min,
        sigma_g,
        c_max,
        c_out_min,
        var_out_min,
        mu_g_out_min,
        u_out_min,
        fraction,
        effect: OutlierEffect::from_fraction(fraction),
    })
}
