use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::{
    keypair::KeyPair, report::Report, role::RoleRequest, survey::Survey, vote::Vote,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would demand `T: Clone`, which we don't need.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a
    /// collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

impl MongoCollection for Survey {
    const NAME: &'static str = "surveys";
}

impl MongoCollection for KeyPair {
    const NAME: &'static str = "keypairs";
}

impl MongoCollection for Vote {
    const NAME: &'static str = "votes";
}

impl MongoCollection for Report {
    const NAME: &'static str = "reports";
}

impl MongoCollection for RoleRequest {
    const NAME: &'static str = "role_requests";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Exactly one keypair per survey.
    let keypair_index = IndexModel::builder()
        .keys(doc! {"survey_id": 1})
        .options(unique)
        .build();
    Coll::<KeyPair>::from_db(db)
        .create_index(keypair_index, None)
        .await?;

    // Tally lookups.
    let vote_index = IndexModel::builder()
        .keys(doc! {"survey_id": 1, "option_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Open-report triage.
    let report_index = IndexModel::builder()
        .keys(doc! {"resolved": 1})
        .build();
    Coll::<Report>::from_db(db)
        .create_index(report_index, None)
        .await?;

    // Open-request lookups by requester.
    let request_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "approved": 1})
        .build();
    Coll::<RoleRequest>::from_db(db)
        .create_index(request_index, None)
        .await?;

    Ok(())
}
