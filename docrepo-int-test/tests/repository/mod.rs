mod repository_modification_test;
mod repository_search_test;

use docrepo::common::Context;
use docrepo::repository::{DefaultFields, Entity};
use docrepo_derive::{Convertible, Indexes};
use fake::faker::internet::en::FreeEmail;
use fake::faker::name::en::FirstName;
use fake::Fake;
use rand::Rng;

#[derive(Debug, Clone, Default, PartialEq, Convertible, Indexes)]
#[indexes(unique = "email", index = "name,-age")]
pub struct TestUser {
    #[converter(flatten)]
    pub meta: DefaultFields,
    pub name: String,
    pub email: String,
    pub age: i32,
    #[converter(skip)]
    pub bio: String,
}

impl Entity for TestUser {
    fn default_fields(&mut self) -> Option<&mut DefaultFields> {
        Some(&mut self.meta)
    }

    fn after_find(&mut self, _ctx: &Context) {
        self.bio = format!("{} is {} years old.", self.name, self.age);
    }
}

impl TestUser {
    pub fn new(name: &str, age: i32) -> Self {
        TestUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            age,
            ..Default::default()
        }
    }

    pub fn generate() -> Self {
        TestUser {
            name: FirstName().fake(),
            email: FreeEmail().fake(),
            age: rand::rng().random_range(18..90),
            ..Default::default()
        }
    }
}

/// Headcount per age, read back from an aggregation.
#[derive(Debug, Default, PartialEq, Convertible)]
pub struct AgeGroup {
    #[converter(rename = "_id")]
    pub age: i32,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Convertible)]
pub struct Address {
    pub city: String,
    pub zip: i32,
}

/// A user with an embedded address document.
#[derive(Debug, Clone, Default, PartialEq, Convertible)]
pub struct Resident {
    #[converter(flatten)]
    pub meta: DefaultFields,
    pub name: String,
    pub address: Address,
}

impl Entity for Resident {
    fn default_fields(&mut self) -> Option<&mut DefaultFields> {
        Some(&mut self.meta)
    }
}

impl Resident {
    pub fn new(name: &str, city: &str, zip: i32) -> Self {
        Resident {
            name: name.to_string(),
            address: Address {
                city: city.to_string(),
                zip,
            },
            ..Default::default()
        }
    }
}
