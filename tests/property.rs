//! Property-based checks over randomly generated presentations (spec.md §8,
//! "Property-based tests").
//!
//! Every generated presentation starts from the free band (each generator forced
//! idempotent, `x^2 = x`) before adding random extra rules: a free band is always finite,
//! and any further rule only identifies more classes, never splits them, so every
//! presentation built this way is guaranteed to terminate. The alphabet is kept to `{2,
//! 3}` rather than spec.md's full `[2,5]` range — free bands grow so fast past 3
//! generators (159 classes at 3, hundreds of thousands at 4) that using the full range
//! would make this suite's runtime unpredictable.

use fp_congruence::alphabet::DefaultLetter as L;
use fp_congruence::{Congruence, CongruenceKind, Containment, Presentation, Word};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_word(rng: &mut StdRng, alphabet: usize, max_len: usize) -> Word<L> {
    let len = rng.gen_range(1..=max_len);
    (0..len).map(|_| rng.gen_range(0..alphabet) as u16).collect()
}

fn random_presentation(rng: &mut StdRng, alphabet: usize) -> Presentation<L> {
    let mut p = Presentation::new(alphabet, false);
    for a in 0..alphabet {
        p.add_rule(vec![a as u16, a as u16].into(), vec![a as u16].into()).unwrap();
    }
    let extra_rules = rng.gen_range(0..=10);
    for _ in 0..extra_rules {
        let u = random_word(rng, alphabet, 6);
        let v = random_word(rng, alphabet, 6);
        if u != v {
            p.add_rule(u, v).unwrap();
        }
    }
    p
}

fn check_properties(mut c: Congruence<L>, rng: &mut StdRng, alphabet: usize) {
    let u = random_word(rng, alphabet, 6);
    assert_eq!(c.contains(&u, &u).unwrap(), Containment::Yes);

    let once = c.reduce(&u).unwrap();
    let twice = c.reduce(&once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(c.contains(&u, &once).unwrap(), Containment::Yes);

    if let Some(n) = c.number_of_classes().unwrap() {
        assert!(n >= 1);
        if let Ok(tc) = c.get_mut::<fp_congruence::todd_coxeter::ToddCoxeterCore<L>>() {
            assert_eq!(tc.normal_forms().len(), n);
        }
    }
}

#[test]
fn random_free_band_presentations_satisfy_core_laws() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for alphabet in [2usize, 3] {
        for _ in 0..5 {
            let p = random_presentation(&mut rng, alphabet);
            let c = Congruence::new(CongruenceKind::TwoSided, p);
            check_properties(c, &mut rng, alphabet);
        }
    }
}

#[test]
fn thread_bound_does_not_change_the_answer() {
    let mut rng = StdRng::seed_from_u64(42);
    let p = random_presentation(&mut rng, 2);
    let u = random_word(&mut rng, 2, 6);
    let v = random_word(&mut rng, 2, 6);

    let mut one = Congruence::new(CongruenceKind::TwoSided, p.clone());
    one.max_threads(1).unwrap();
    let answer_one = one.contains(&u, &v).unwrap();

    let mut many = Congruence::new(CongruenceKind::TwoSided, p);
    many.max_threads(4).unwrap();
    let answer_many = many.contains(&u, &v).unwrap();

    assert_eq!(answer_one, answer_many);
}
