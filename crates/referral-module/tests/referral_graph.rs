use rand::{rngs::StdRng, Rng, SeedableRng};
use referral_module::{Linked, PermilTable, ReferralEngine, ReferralError, ReferralTree};

const ACCOUNTS: u32 = 40;

fn random_tree(seed: u64, attempts: usize) -> ReferralTree<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = ReferralTree::new();
    for _ in 0..attempts {
        let referrer = rng.gen_range(0..ACCOUNTS);
        let user = rng.gen_range(0..ACCOUNTS);
        match tree.add_or_get(referrer, user) {
            Ok(_) => {}
            Err(ReferralError::SelfReferral) => assert_eq!(referrer, user),
            Err(ReferralError::ReferrerCycle) => {
                assert!(tree.ancestry(&referrer, usize::MAX).contains(&user))
            }
            Err(other) => panic!("unexpected error {other}"),
        }
    }
    tree
}

#[test]
fn referred_number_counts_every_descendant() {
    for seed in 0..20 {
        let tree = random_tree(seed, 200);
        for account in 0..ACCOUNTS {
            let descendants = (0..ACCOUNTS)
                .filter(|user| tree.ancestry(user, usize::MAX).contains(&account))
                .count() as u64;
            assert_eq!(tree.referred_number(&account), descendants, "seed {seed}");
        }
    }
}

#[test]
fn random_graphs_stay_acyclic() {
    for seed in 0..20 {
        let tree = random_tree(seed, 500);
        for (user, _) in tree.edges() {
            let chain = tree.ancestry(user, usize::MAX);
            assert!(!chain.contains(user), "seed {seed}: {user} reaches itself");
        }
    }
}

#[test]
fn existing_edges_are_never_replaced() {
    let mut tree = random_tree(7, 300);
    let before: Vec<(u32, u32)> = tree.edges().map(|(u, r)| (*u, *r)).collect();
    for &(user, referrer) in &before {
        let other = (referrer + 1) % ACCOUNTS;
        assert_eq!(
            tree.add_or_get(other, user).unwrap(),
            Linked::Existing(referrer)
        );
    }
    let after: Vec<(u32, u32)> = tree.edges().map(|(u, r)| (*u, *r)).collect();
    assert_eq!(before, after);
}

#[test]
fn bonuses_follow_the_chain_upward() {
    let tree = random_tree(11, 400);
    let permils = PermilTable::new(vec![600, 10, 10]).unwrap();
    let engine = ReferralEngine::new(&permils, &tree);
    let amount = 100 * 10u128.pow(18);
    for account in 0..ACCOUNTS {
        let bonuses = engine.calculate_bonuses(&account, amount);
        let chain = tree.ancestry(&account, 3);
        assert_eq!(bonuses.len(), chain.len());
        for (bonus, expected_to) in bonuses.iter().zip(chain) {
            assert_eq!(bonus.to, expected_to);
            let permil = permils.get(bonus.depth as usize).unwrap() as u128;
            assert_eq!(bonus.bonus, amount * permil / 10_000);
        }
    }
}
