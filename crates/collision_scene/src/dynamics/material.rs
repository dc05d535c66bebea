//! Surface materials and how two of them combine at a contact

use serde::{Deserialize, Serialize};

/// Surface response parameters of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Fraction of normal speed kept after a bounce (0 = dead stop, 1 = elastic)
    pub restitution: f32,
    /// Friction coefficient while the contact is not sliding
    pub static_friction: f32,
    /// Friction coefficient while sliding
    pub kinetic_friction: f32,
    /// Friction coefficient while rolling without slipping
    pub rolling_friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.5,
            static_friction: 0.6,
            kinetic_friction: 0.4,
            rolling_friction: 0.05,
        }
    }
}

impl Material {
    /// Material that bounces with `restitution` and has no friction
    pub fn frictionless(restitution: f32) -> Self {
        Self {
            restitution,
            static_friction: 0.0,
            kinetic_friction: 0.0,
            rolling_friction: 0.0,
        }
    }

    /// Friction coefficient for a contact regime
    pub fn friction(&self, regime: FrictionRegime) -> f32 {
        match regime {
            FrictionRegime::Static => self.static_friction,
            FrictionRegime::Kinematic => self.kinetic_friction,
            FrictionRegime::Rolling => self.rolling_friction,
        }
    }
}

/// How the coefficients of two touching materials are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendPolicy {
    /// Smaller of the two
    Minimum,
    /// Average of the two
    #[default]
    ArithmeticMean,
    /// Square root of the product
    GeometricMean,
    /// The active body's coefficient only
    Active,
}

impl BlendPolicy {
    /// Combine the active and passive coefficients
    pub fn blend(self, active: f32, passive: f32) -> f32 {
        match self {
            Self::Minimum => active.min(passive),
            Self::ArithmeticMean => 0.5 * (active + passive),
            Self::GeometricMean => (active * passive).max(0.0).sqrt(),
            Self::Active => active,
        }
    }
}

/// Contact regime deciding which friction coefficient applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrictionRegime {
    /// Contact point at rest relative to the other surface
    Static,
    /// Contact point sliding
    Kinematic,
    /// Contact point at rest while the body spins
    Rolling,
}

impl FrictionRegime {
    /// Classify a contact from the tangential speed at the contact point
    /// and the spin of the bodies involved
    pub fn classify(tangential_speed: f32, angular_speed: f32, threshold: f32) -> Self {
        if tangential_speed >= threshold {
            Self::Kinematic
        } else if angular_speed >= threshold {
            Self::Rolling
        } else {
            Self::Static
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_blend_policies() {
        assert_relative_eq!(BlendPolicy::Minimum.blend(0.2, 0.8), 0.2);
        assert_relative_eq!(BlendPolicy::ArithmeticMean.blend(0.2, 0.8), 0.5);
        assert_relative_eq!(BlendPolicy::GeometricMean.blend(0.25, 1.0), 0.5);
        assert_relative_eq!(BlendPolicy::Active.blend(0.2, 0.8), 0.2);
        assert_relative_eq!(BlendPolicy::Active.blend(0.8, 0.2), 0.8);
    }

    #[test]
    fn test_regime_classification() {
        assert_eq!(FrictionRegime::classify(1.0, 0.0, 0.1), FrictionRegime::Kinematic);
        assert_eq!(FrictionRegime::classify(0.01, 0.0, 0.1), FrictionRegime::Static);
        assert_eq!(FrictionRegime::classify(0.01, 3.0, 0.1), FrictionRegime::Rolling);

        let material = Material::default();
        assert_relative_eq!(material.friction(FrictionRegime::Rolling), material.rolling_friction);
        assert_relative_eq!(Material::frictionless(1.0).friction(FrictionRegime::Static), 0.0);
    }
}
