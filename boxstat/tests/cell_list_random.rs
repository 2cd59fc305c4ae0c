//! Test the cell list construction by randomizing the particle positions
//! and checking it against brute force searches

use std::collections::HashSet;

use boxstat::{geometry::*, locality::*};
use rand::SeedableRng;
use rand_distr::Distribution;

const NUM_PARTICLES: usize = 1000;
const POS_RNG_SEED: u64 = 12345678910;
const DOMAIN_SIZE: f64 = 10.0;

fn random_positions(seed: u64, n: usize, sim_box: &SimBox) -> Vec<[f64; 3]> {
    let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed);
    let [lx, ly, lz] = sim_box.lengths();
    let dist = rand_distr::Uniform::new(-0.5, 0.5);
    (0..n)
        .map(|_| {
            let x = dist.sample(&mut rng) * lx;
            let y = dist.sample(&mut rng) * ly;
            let z = if sim_box.is_2d() { 0.0 } else { dist.sample(&mut rng) * lz };
            [x, y, z]
        })
        .collect()
}

fn boxes() -> Vec<SimBox> {
    vec![
        SimBox::cube(DOMAIN_SIZE).unwrap(),
        SimBox::new(DOMAIN_SIZE, 7.0, 4.5).unwrap(),
        SimBox::cube(DOMAIN_SIZE).unwrap().with_periodic([true, false, true]),
        SimBox::cube(DOMAIN_SIZE).unwrap().with_periodic([false; 3]),
        SimBox::new_2d(DOMAIN_SIZE, 6.0).unwrap(),
    ]
}

#[test]
fn cell_chains_partition_particles() {
    for (ibox, sim_box) in boxes().into_iter().enumerate() {
        let positions = random_positions(POS_RNG_SEED + ibox as u64, NUM_PARTICLES, &sim_box);
        let points = Points::new(sim_box.clone(), &positions).unwrap();
        for cell_width in [0.7, 1.0, 2.5, 4.0, 20.0] {
            let mut cell_list = CellList::new(sim_box.clone(), cell_width).unwrap();
            cell_list.compute(&points).unwrap();
            let mut seen = vec![false; NUM_PARTICLES];
            for cell in 0..cell_list.num_cells() {
                for idx in cell_list.iter_cell(cell) {
                    assert!(!seen[idx], "Particle {} appears in more than one chain", idx);
                    seen[idx] = true;
                    assert_eq!(cell_list.cell_of(positions[idx]), cell);
                }
            }
            assert!(seen.iter().all(|x| *x), "Some particles are missing from the cell list");
        }
    }
}

#[test]
fn neighbor_cells_are_adjacent() {
    for sim_box in boxes() {
        let cell_list = CellList::new(sim_box.clone(), 1.5).unwrap();
        let (nx, ny, nz) = cell_list.cell_topology();
        let periodic = sim_box.periodic();
        // Whether two cell coordinates along one axis are adjacent
        let adjacent = |a: usize, b: usize, n: usize, periodic: bool| {
            let d = (a as isize - b as isize).abs() as usize;
            d <= 1 || (periodic && d == n - 1)
        };
        for cell in 0..cell_list.num_cells() {
            let c = cell_list.cell_coord_of_index(cell);
            let neighbors = cell_list.cell_neighbors(cell);
            assert!(neighbors.contains(&cell));
            let unique = neighbors.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), neighbors.len());
            for &neighbor in neighbors {
                let c2 = cell_list.cell_coord_of_index(neighbor);
                assert!(adjacent(c.0, c2.0, nx, periodic[0]));
                assert!(adjacent(c.1, c2.1, ny, periodic[1]));
                assert!(adjacent(c.2, c2.2, nz, periodic[2]));
            }
        }
    }
}

#[test]
fn ball_queries_match_brute_force() {
    const CUTOFF: f64 = 1.2;
    for (ibox, sim_box) in boxes().into_iter().enumerate() {
        let positions = random_positions(POS_RNG_SEED * 3 + ibox as u64, NUM_PARTICLES, &sim_box);
        let points = Points::new(sim_box.clone(), &positions).unwrap();
        let mut cell_list = CellList::new(sim_box.clone(), CUTOFF).unwrap();
        cell_list.compute(&points).unwrap();
        for query in positions.iter().step_by(37) {
            let found = cell_list.neighbors_within(*query, CUTOFF).unwrap();
            let expected = positions.iter()
                .enumerate()
                .filter(|(_, p)| sim_box.distance(*query, **p) < CUTOFF)
                .map(|(j, _)| j)
                .collect::<Vec<_>>();
            assert_eq!(found, expected);
        }
    }
}

#[test]
fn repopulation_follows_moving_particles() {
    let sim_box = SimBox::cube(DOMAIN_SIZE).unwrap();
    let mut cell_list = CellList::new(sim_box.clone(), 2.0).unwrap();
    for step in 0..5 {
        let positions = random_positions(POS_RNG_SEED + 100 + step, 200, &sim_box);
        cell_list.compute(&Points::new(sim_box.clone(), &positions).unwrap()).unwrap();
        assert_eq!(cell_list.n_points(), 200);
        let total = (0..cell_list.num_cells())
            .map(|cell| cell_list.iter_cell(cell).count())
            .sum::<usize>();
        assert_eq!(total, 200);
    }
}
