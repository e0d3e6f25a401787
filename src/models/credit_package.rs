use serde::Serialize;
use utoipa::ToSchema;

/// Cost of one 3D generation, in credits.
pub const GENERATION_COST: i64 = 10;

/// Welcome bonus granted at registration.
pub const SIGNUP_BONUS_CREDITS: i64 = 10;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreditPackage {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i64,
    pub bonus: i64,
    /// Price in bani (RON cents).
    pub price: i64,
    pub popular: bool,
}

impl CreditPackage {
    /// Credits granted on purchase, bonus included.
    pub fn total_credits(&self) -> i64 {
        self.credits + self.bonus
    }
}

pub const CREDIT_PACKAGES: &[CreditPackage] = &[
    CreditPackage {
        id: "starter",
        name: "Micul Explorator",
        credits: 50,
        bonus: 0,
        price: 2500,
        popular: false,
    },
    CreditPackage {
        id: "creator",
        name: "Super Creator",
        credits: 200,
        bonus: 0,
        price: 8000,
        popular: true,
    },
    CreditPackage {
        id: "master",
        name: "Maestrul 3D",
        credits: 500,
        bonus: 50,
        price: 15000,
        popular: false,
    },
];

pub fn get_credit_package_by_id(id: &str) -> Option<&'static CreditPackage> {
    CREDIT_PACKAGES.iter().find(|pkg| pkg.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_package() {
        let pkg = get_credit_package_by_id("creator").unwrap();
        assert_eq!(pkg.name, "Super Creator");
        assert_eq!(pkg.credits, 200);
        assert_eq!(pkg.price, 8000);
        assert!(pkg.popular);
    }

    #[test]
    fn lookup_unknown_package() {
        assert!(get_credit_package_by_id("platinum").is_none());
    }

    #[test]
    fn total_credits_includes_bonus() {
        let pkg = get_credit_package_by_id("master").unwrap();
        assert_eq!(pkg.total_credits(), 550);
        let pkg = get_credit_package_by_id("starter").unwrap();
        assert_eq!(pkg.total_credits(), 50);
    }
}
