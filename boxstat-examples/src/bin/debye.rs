use anyhow::Result;
use rand::SeedableRng;
use rand_distr::Distribution;

use boxstat::{diffraction::StructureFactorBuilder, geometry::{Points, SimBox}};

fn main() -> Result<()> {
    const BOX_LENGTH: f64 = 10.0;
    const LATTICE_SIDE: usize = 5;
    const NUM_FRAMES: usize = 10;

    // Simple cubic lattice with thermal noise
    let spacing = BOX_LENGTH / LATTICE_SIDE as f64;
    let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(8796541562138);
    let noise = rand_distr::Normal::new(0.0, 0.1 * spacing)?;

    let sim_box = SimBox::cube(BOX_LENGTH)?;
    let mut sf = StructureFactorBuilder::new(100, 10.0)
        .with_k_min(1.0)
        .build()?;
    println!("Structure factor valid above k = {:.4}", 4.0 * std::f64::consts::PI / BOX_LENGTH);

    for _ in 0..NUM_FRAMES {
        let mut positions = Vec::with_capacity(LATTICE_SIDE.pow(3));
        for i in 0..LATTICE_SIDE {
            for j in 0..LATTICE_SIDE {
                for k in 0..LATTICE_SIDE {
                    let site = [i, j, k].map(|c| (c as f64 + 0.5) * spacing - BOX_LENGTH / 2.0);
                    let jittered = site.map(|x| x + noise.sample(&mut rng));
                    positions.push(sim_box.wrap_position(jittered));
                }
            }
        }
        let points = Points::new(sim_box.clone(), &positions)?;
        sf.accumulate(&points, &positions, positions.len())?;
    }
    sf.reduce();

    for (k, s) in sf.bin_centers().iter().zip(sf.structure_factor().iter()) {
        println!("{:8.4} {:12.6}", k, s);
    }
    ndarray_npy::write_npy("debye_k.npy", &ndarray::Array1::from(sf.bin_centers().to_vec()))?;
    ndarray_npy::write_npy("debye_sf.npy", &sf.structure_factor())?;
    println!("Averaged {} frames, wrote debye_k.npy and debye_sf.npy", sf.frame_count());
    Ok(())
}
