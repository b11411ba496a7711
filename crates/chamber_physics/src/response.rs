use chamber_core::{MIN_SEPARATION, Vector, dot, length_squared, sub};

/// What a collision response needs to know about one atom (internal units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vector,
    pub velocity: Vector,
    pub mass: f64,
}

/// Strategy for resolving a confirmed contact.
///
/// Returns the new velocities of `a` and `b`, or `None` to leave both
/// untouched. Implementations only ever produce velocities; positions and
/// every other atom stay as they are.
pub trait CollisionResponse: Send + Sync {
    fn respond(&self, a: &Body, b: &Body) -> Option<(Vector, Vector)>;
}

/// Hard-sphere elastic collision along the line of centres.
///
/// The velocity components parallel to the contact normal are exchanged by
/// the 1-D elastic formula; perpendicular components are kept. Pairs that are
/// not closing (separating, tangential, or with coincident centres) are
/// skipped, so a pair seen twice in one tick is only resolved once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElasticCollision;

impl CollisionResponse for ElasticCollision {
    fn respond(&self, a: &Body, b: &Body) -> Option<(Vector, Vector)> {
        let total_mass = a.mass + b.mass;
        if !(total_mass > 0.0) {
            return None;
        }

        let offset = sub(&b.position, &a.position);
        let dist2 = length_squared(&offset);
        if !(dist2 > MIN_SEPARATION * MIN_SEPARATION) {
            return None;
        }
        let axis = offset.map(|x| x / dist2.sqrt());

        let pa = dot(&a.velocity, &axis);
        let pb = dot(&b.velocity, &axis);
        if !(pa - pb > 0.0) {
            return None;
        }

        let next_pa = (2.0 * b.mass * pb + pa * (a.mass - b.mass)) / total_mass;
        let next_pb = (2.0 * a.mass * pa + pb * (b.mass - a.mass)) / total_mass;

        let va = std::array::from_fn(|d| a.velocity[d] + axis[d] * (next_pa - pa));
        let vb = std::array::from_fn(|d| b.velocity[d] + axis[d] * (next_pb - pb));
        Some((va, vb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn body(position: Vector, velocity: Vector, mass: f64) -> Body {
        Body {
            position,
            velocity,
            mass,
        }
    }

    fn momentum(b: &Body, v: &Vector) -> Vector {
        v.map(|x| x * b.mass)
    }

    fn energy(b: &Body, v: &Vector) -> f64 {
        0.5 * b.mass * length_squared(v)
    }

    #[test]
    fn test_equal_masses_head_on_swap() {
        let a = body([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0);
        let b = body([0.15, 0.0, 0.0], [-1.0, 0.0, 0.0], 1.0);
        let (va, vb) = ElasticCollision.respond(&a, &b).unwrap();
        assert!((va[0] + 1.0).abs() < 1e-12 && va[1].abs() < 1e-12);
        assert!((vb[0] - 1.0).abs() < 1e-12 && vb[1].abs() < 1e-12);
    }

    #[test]
    fn test_tangential_component_kept() {
        let a = body([0.0, 0.0, 0.0], [1.0, 0.5, -0.25], 2.0);
        let b = body([0.1, 0.0, 0.0], [0.0, 0.0, 0.0], 2.0);
        let (va, vb) = ElasticCollision.respond(&a, &b).unwrap();
        assert!(va[0].abs() < 1e-12);
        assert_eq!(va[1], 0.5);
        assert_eq!(va[2], -0.25);
        assert!((vb[0] - 1.0).abs() < 1e-12);
        assert_eq!(vb[1], 0.0);
    }

    #[test]
    fn test_conserves_momentum_and_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut resolved = 0;
        for _ in 0..10_000 {
            let a = body(
                std::array::from_fn(|_| rng.gen_range(-1.0..1.0)),
                std::array::from_fn(|_| rng.gen_range(-5.0..5.0)),
                rng.gen_range(0.1..100.0),
            );
            let b = body(
                std::array::from_fn(|_| rng.gen_range(-1.0..1.0)),
                std::array::from_fn(|_| rng.gen_range(-5.0..5.0)),
                rng.gen_range(0.1..100.0),
            );
            let Some((va, vb)) = ElasticCollision.respond(&a, &b) else {
                continue;
            };
            resolved += 1;

            let before_p: Vector = std::array::from_fn(|d| {
                momentum(&a, &a.velocity)[d] + momentum(&b, &b.velocity)[d]
            });
            let after_p: Vector =
                std::array::from_fn(|d| momentum(&a, &va)[d] + momentum(&b, &vb)[d]);
            let scale = length_squared(&before_p).sqrt().max(a.mass + b.mass);
            for d in 0..3 {
                assert!((before_p[d] - after_p[d]).abs() / scale < 1e-9);
            }

            let before_e = energy(&a, &a.velocity) + energy(&b, &b.velocity);
            let after_e = energy(&a, &va) + energy(&b, &vb);
            assert!((before_e - after_e).abs() / before_e < 1e-9);

            // Afterwards the pair separates along the normal.
            let axis = sub(&b.position, &a.position);
            assert!(dot(&va, &axis) - dot(&vb, &axis) <= 1e-9 * length_squared(&axis).sqrt());
        }
        assert!(resolved > 1000);
    }

    #[test]
    fn test_separating_pair_skipped() {
        let a = body([0.0; 3], [-1.0, 0.0, 0.0], 1.0);
        let b = body([0.1, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0);
        assert_eq!(ElasticCollision.respond(&a, &b), None);

        // Equal normal velocities: touching but not closing.
        let a = body([0.0; 3], [1.0, 0.0, 0.0], 1.0);
        let b = body([0.1, 0.0, 0.0], [1.0, 3.0, 0.0], 1.0);
        assert_eq!(ElasticCollision.respond(&a, &b), None);
    }

    #[test]
    fn test_degenerate_inputs_skipped() {
        let a = body([0.5; 3], [1.0, 0.0, 0.0], 1.0);
        let b = body([0.5; 3], [-1.0, 0.0, 0.0], 1.0);
        assert_eq!(ElasticCollision.respond(&a, &b), None);

        let a = body([0.0; 3], [1.0, 0.0, 0.0], 0.0);
        let b = body([0.1, 0.0, 0.0], [-1.0, 0.0, 0.0], 0.0);
        assert_eq!(ElasticCollision.respond(&a, &b), None);
    }

    #[test]
    fn test_massless_atom_bounces_off_heavy_one() {
        let a = body([0.0; 3], [1.0, 0.0, 0.0], 0.0);
        let b = body([0.5, 0.0, 0.0], [0.0, 0.0, 0.0], 1.0);
        let (va, vb) = ElasticCollision.respond(&a, &b).unwrap();
        assert_eq!(va, [-1.0, 0.0, 0.0]);
        assert_eq!(vb, [0.0, 0.0, 0.0]);
    }
}
