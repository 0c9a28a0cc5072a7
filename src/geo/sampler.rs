use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, RngCore};
use std::f64::consts::PI;

use super::{Coordinate, EARTH_RADIUS_KM};

/// A source of uniform random numbers in `[0, 1)`.
///
/// The sampler never reaches for a global generator, so tests can script
/// exact draws or seed a [`StdRng`].
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl UniformSource for StdRng {
    fn next_uniform(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl UniformSource for ThreadRng {
    fn next_uniform(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Adapts any [`rand::Rng`] into a [`UniformSource`].
///
/// ```rust
/// use geotagger::geo::{RngSource, UniformSource};
/// use rand::SeedableRng;
///
/// let mut source = RngSource(rand::rngs::SmallRng::seed_from_u64(1));
/// let u = source.next_uniform();
/// assert!((0.0..1.0).contains(&u));
/// ```
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: RngCore> UniformSource for RngSource<R> {
    fn next_uniform(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

impl<U: UniformSource + ?Sized> UniformSource for &mut U {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// Draws points uniformly by area inside a disc around a center.
///
/// Uses the small-angle (flat disc) approximation with a `cos(latitude)`
/// longitude correction. Accuracy degrades towards the poles, and results
/// are not clamped or wrapped: a disc that crosses a pole or the
/// antimeridian yields out-of-range values as-is.
///
/// ```rust
/// use geotagger::geo::{Coordinate, RadiusSampler};
/// use rand::SeedableRng;
///
/// let mut sampler = RadiusSampler::new(rand::rngs::StdRng::seed_from_u64(7));
/// let center = Coordinate::new(34.05, -118.24);
/// let point = sampler.sample(center, 5.0);
/// assert!(center.distance_km(&point) <= 5.0 * 1.01);
/// ```
#[derive(Debug)]
pub struct RadiusSampler<R> {
    rng: R,
}

impl<R: UniformSource> RadiusSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Sample a point within `radius_km` of `center`.
    ///
    /// A radius that is zero, negative or NaN returns `center` unchanged
    /// without consuming any randomness.
    pub fn sample(&mut self, center: Coordinate, radius_km: f64) -> Coordinate {
        if !(radius_km > 0.0) {
            return center;
        }

        let r = radius_km / EARTH_RADIUS_KM;
        let u = self.rng.next_uniform();
        let v = self.rng.next_uniform();

        // sqrt keeps the density uniform by area rather than by radius
        let w = r * u.sqrt();
        let t = 2.0 * PI * v;
        let x = w * t.cos();
        let y = w * t.sin();

        Coordinate {
            lat: center.lat + x * 180.0 / PI,
            lon: center.lon + y * 180.0 / (PI * center.lat.to_radians().cos()),
        }
    }
}
