use anyhow::Result;
use rand::SeedableRng;
use rand_distr::Distribution;

use boxstat::{density::GaussianDensityBuilder, geometry::{Points, SimBox}};

fn main() -> Result<()> {
    const BOX_LENGTH: f64 = 20.0;
    const NUM_PARTICLES: usize = 500;
    const SIGMA: f64 = 0.5;

    // Seed RNG so the output is reproducible
    let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(5436576605279307334);
    let dist = rand_distr::Uniform::new(-BOX_LENGTH / 2.0, BOX_LENGTH / 2.0);
    // Two thirds of the particles in a dense slab around z = 0
    let slab = rand_distr::Normal::new(0.0, 1.5)?;
    let positions = (0..NUM_PARTICLES)
        .map(|i| {
            let z = if i % 3 == 0 { dist.sample(&mut rng) } else { slab.sample(&mut rng) };
            [dist.sample(&mut rng), dist.sample(&mut rng), z]
        })
        .collect::<Vec<_>>();

    let sim_box = SimBox::cube(BOX_LENGTH)?;
    let points = Points::new(sim_box, &positions)?;

    let mut density = GaussianDensityBuilder::cubic(64, 3.0 * SIGMA, SIGMA)
        .build()?;
    density.compute(&points)?;

    // Average over x and y to show the slab
    let profile = density.density().sum_axis(ndarray::Axis(0)).sum_axis(ndarray::Axis(0)) / (64.0 * 64.0);
    for (k, value) in profile.iter().enumerate() {
        let z = -BOX_LENGTH / 2.0 + (k as f64 + 0.5) * BOX_LENGTH / 64.0;
        println!("{:8.3} {:12.6}", z, value);
    }

    ndarray_npy::write_npy("gaussian_density.npy", &density.density())?;
    println!("Wrote density grid {:?} to gaussian_density.npy", density.density().dim());
    Ok(())
}
