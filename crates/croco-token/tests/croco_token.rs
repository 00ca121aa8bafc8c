use croco_token::{tokens, Address, CrocoToken, TokenConfig, TokenError};

struct Fixture {
    token: CrocoToken,
    owner: Address,
    acc1: Address,
    acc2: Address,
    acc3: Address,
    accs: Vec<Address>,
}

fn deploy() -> Fixture {
    let owner = Address::from_label("owner");
    Fixture {
        token: CrocoToken::new(owner, TokenConfig::default()).unwrap(),
        owner,
        acc1: Address::from_label("acc1"),
        acc2: Address::from_label("acc2"),
        acc3: Address::from_label("acc3"),
        accs: (0..5)
            .map(|i| Address::from_label(&format!("accs{i}")))
            .collect(),
    }
}

/// acc1 holds 100 000 CRCO, is the referral pool, and payouts are on.
fn referral_acc1() -> Fixture {
    let mut f = deploy();
    f.token.mint(f.owner, f.acc1, tokens(100_000)).unwrap();
    f.token.set_referral_pool(f.owner, f.acc1).unwrap();
    f.token.toggle_referral_active(f.owner).unwrap();
    f
}

mod general {
    use super::*;

    #[test]
    fn should_mint() {
        let mut f = deploy();
        f.token.mint(f.owner, f.acc1, tokens(1)).unwrap();
        assert_eq!(f.token.balance_of(&f.acc1), tokens(1));
    }

    #[test]
    fn should_set_referral_pool() {
        let mut f = deploy();
        assert_eq!(f.token.referral_pool(), Address::ZERO);
        f.token.set_referral_pool(f.owner, f.acc1).unwrap();
        assert_eq!(f.token.referral_pool(), f.acc1);
    }

    #[test]
    fn should_toggle_referral_active() {
        let mut f = deploy();
        assert!(!f.token.referral_active());
        f.token.toggle_referral_active(f.owner).unwrap();
        assert!(f.token.referral_active());
        f.token.toggle_referral_active(f.owner).unwrap();
        assert!(!f.token.referral_active());
    }

    #[test]
    fn should_change_referral_permils() {
        let mut f = deploy();
        assert_eq!(f.token.referral_permils(0), Some(300));
        assert_eq!(f.token.referral_permils(1), Some(200));
        f.token
            .set_referral_permils(f.owner, vec![600, 10, 10])
            .unwrap();
        assert_eq!(f.token.referral_permils(0), Some(600));
        assert_eq!(f.token.referral_permils(1), Some(10));
        assert_eq!(f.token.referral_permils(3), None);
    }

    #[test]
    fn should_be_able_to_refer_user() {
        let mut f = referral_acc1();
        f.token.add_operator(f.owner, f.acc2).unwrap();
        f.token.add_or_get_referrer(f.acc2, f.acc3, f.acc2).unwrap();
        assert_eq!(f.token.get_referred_number(&f.acc3), 1);
        assert_eq!(f.token.get_referrer(&f.acc2), f.acc3);
    }

    #[test]
    fn should_not_be_able_to_refer_self() {
        let mut f = referral_acc1();
        f.token.add_operator(f.owner, f.acc2).unwrap();
        let err = f
            .token
            .add_or_get_referrer(f.acc2, f.acc2, f.acc2)
            .unwrap_err();
        assert_eq!(err.to_string(), "Can not add self as referrer");
    }

    #[test]
    fn should_not_be_able_to_refer_each_other() {
        let mut f = referral_acc1();
        f.token.add_operator(f.owner, f.acc2).unwrap();
        f.token.add_or_get_referrer(f.acc2, f.acc2, f.acc3).unwrap();
        let err = f
            .token
            .add_or_get_referrer(f.acc2, f.acc3, f.acc2)
            .unwrap_err();
        assert_eq!(err.to_string(), "Referred can not refer its referrer");

        let edges = f.token.referrals().len();
        assert_eq!(
            f.token.add_or_get_referrer(f.owner, f.owner, f.acc3).unwrap(),
            f.acc2
        );
        assert_eq!(f.token.referrals().len(), edges);
    }

    #[test]
    fn should_return_correct_numbers() {
        let mut f = referral_acc1();
        let o = f.owner;
        f.token.add_or_get_referrer(o, f.owner, f.acc1).unwrap();
        f.token.add_or_get_referrer(o, f.acc1, f.acc2).unwrap();
        f.token.add_or_get_referrer(o, f.acc1, f.accs[3]).unwrap();
        f.token.add_or_get_referrer(o, f.acc2, f.acc3).unwrap();
        // accs[3] already has a referrer, so this does not add.
        assert_eq!(
            f.token.add_or_get_referrer(o, f.acc3, f.accs[3]).unwrap(),
            f.acc1
        );

        assert_eq!(f.token.get_referred_number(&f.owner), 4);
        assert_eq!(f.token.get_referred_number(&f.acc1), 3);
        assert_eq!(f.token.get_referred_number(&f.acc2), 1);
        assert_eq!(f.token.get_referred_number(&f.acc3), 0);
    }

    #[test]
    fn should_return_correct_bonuses() {
        let mut f = referral_acc1();
        let o = f.owner;
        f.token.add_or_get_referrer(o, f.owner, f.acc1).unwrap();
        f.token.add_or_get_referrer(o, f.acc1, f.acc2).unwrap();
        f.token.add_or_get_referrer(o, f.acc2, f.acc3).unwrap();
        f.token.add_or_get_referrer(o, f.acc3, f.accs[3]).unwrap();

        let permil = |i| f.token.referral_permils(i).unwrap() as u128;
        let bonuses = f.token.get_referral_amount(&f.acc3, tokens(100));
        assert_eq!(bonuses.len(), 3);
        assert_eq!(bonuses[0].to, f.acc2);
        assert_eq!(bonuses[0].bonus, tokens(100) * permil(0) / 10_000);
        assert_eq!(bonuses[1].to, f.acc1);
        assert_eq!(bonuses[1].bonus, tokens(100) * permil(1) / 10_000);
        assert_eq!(bonuses[2].to, f.owner);
        assert_eq!(bonuses[2].bonus, tokens(100) * permil(2) / 10_000);
    }

    #[test]
    fn should_transfer_referral_tokens() {
        let mut f = referral_acc1();
        f.token.mint(f.owner, f.acc2, tokens(1_000)).unwrap();
        f.token.approve(f.acc2, f.acc2, tokens(1_000)).unwrap();
        f.token
            .transfer_referral(f.acc2, f.acc2, f.owner, tokens(100), f.acc3)
            .unwrap();
        let permil0 = f.token.referral_permils(0).unwrap() as u128;

        let bonus = tokens(100) * permil0 / 10_000;
        assert_eq!(f.token.balance_of(&f.acc3), bonus);
        assert_eq!(f.token.get_referrer(&f.owner), f.acc3);
        assert_eq!(f.token.get_referred_number(&f.acc3), 1);
        assert_eq!(f.token.balance_of(&f.owner), tokens(100));
        assert_eq!(f.token.balance_of(&f.acc1), tokens(100_000) - bonus);
    }
}

mod referral_layers {
    use super::*;

    #[test]
    fn pays_every_level_of_the_chain_from_the_pool() {
        let mut f = referral_acc1();
        let o = f.owner;
        f.token.add_or_get_referrer(o, f.accs[0], f.accs[1]).unwrap();
        f.token.add_or_get_referrer(o, f.accs[1], f.accs[2]).unwrap();
        f.token.add_or_get_referrer(o, f.accs[2], f.accs[3]).unwrap();
        f.token.mint(o, f.acc2, tokens(1_000)).unwrap();
        f.token.approve(f.acc2, f.acc2, tokens(1_000)).unwrap();

        let paid = f
            .token
            .transfer_referral(f.acc2, f.acc2, f.acc3, tokens(100), f.accs[3])
            .unwrap();
        let recipients: Vec<Address> = paid.iter().map(|b| b.to).collect();
        assert_eq!(recipients, vec![f.accs[3], f.accs[2], f.accs[1]]);
        assert_eq!(f.token.balance_of(&f.accs[3]), tokens(3));
        assert_eq!(f.token.balance_of(&f.accs[2]), tokens(2));
        assert_eq!(f.token.balance_of(&f.accs[1]), tokens(1));
        assert_eq!(f.token.balance_of(&f.accs[0]), 0);
        assert_eq!(f.token.balance_of(&f.acc1), tokens(100_000 - 6));
        assert_eq!(f.token.total_supply(), tokens(101_000));
    }

    #[test]
    fn second_transfer_keeps_first_referrer() {
        let mut f = referral_acc1();
        f.token.mint(f.owner, f.acc2, tokens(1_000)).unwrap();
        f.token.approve(f.acc2, f.acc2, tokens(1_000)).unwrap();
        f.token
            .transfer_referral(f.acc2, f.acc2, f.owner, tokens(100), f.acc3)
            .unwrap();
        f.token
            .transfer_referral(f.acc2, f.acc2, f.owner, tokens(100), f.accs[0])
            .unwrap();
        assert_eq!(f.token.get_referrer(&f.owner), f.acc3);
        assert_eq!(f.token.balance_of(&f.accs[0]), 0);
        assert_eq!(f.token.balance_of(&f.acc3), tokens(6));
    }

    #[test]
    fn transfer_referral_needs_allowance() {
        let mut f = referral_acc1();
        f.token.mint(f.owner, f.acc2, tokens(1_000)).unwrap();
        let err = f
            .token
            .transfer_referral(f.acc2, f.acc2, f.owner, tokens(100), f.acc3)
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { .. }));
        assert_eq!(f.token.get_referrer(&f.owner), Address::ZERO);
        assert_eq!(f.token.balance_of(&f.acc2), tokens(1_000));
    }

    #[test]
    fn self_referral_through_transfer_reverts() {
        let mut f = referral_acc1();
        f.token.mint(f.owner, f.acc2, tokens(10)).unwrap();
        f.token.approve(f.acc2, f.acc2, tokens(10)).unwrap();
        let before = f.token.clone();
        let err = f
            .token
            .transfer_referral(f.acc2, f.acc2, f.acc3, tokens(10), f.acc3)
            .unwrap_err();
        assert_eq!(err.to_string(), "Can not add self as referrer");
        assert_eq!(f.token, before);
    }
}

mod access {
    use super::*;

    #[test]
    fn referral_admin_calls_need_operator() {
        let mut f = deploy();
        let outsider = f.acc1;
        let denied = TokenError::NotOperator { caller: outsider };
        assert_eq!(f.token.set_referral_pool(outsider, outsider), Err(denied.clone()));
        assert_eq!(f.token.toggle_referral_active(outsider), Err(denied.clone()));
        assert_eq!(
            f.token.set_referral_permils(outsider, vec![1]),
            Err(denied.clone())
        );
        assert_eq!(
            f.token.add_or_get_referrer(outsider, f.acc2, f.acc3),
            Err(denied)
        );
        assert_eq!(
            f.token.add_operator(outsider, outsider),
            Err(TokenError::NotOwner { caller: outsider })
        );
        assert!(f.token.events().is_empty());
    }

    #[test]
    fn removed_operator_loses_rights() {
        let mut f = deploy();
        f.token.add_operator(f.owner, f.acc2).unwrap();
        f.token.add_or_get_referrer(f.acc2, f.acc1, f.acc3).unwrap();
        f.token.remove_operator(f.owner, f.acc2).unwrap();
        assert!(f.token.add_or_get_referrer(f.acc2, f.acc1, f.accs[0]).is_err());
    }
}
