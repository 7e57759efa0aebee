//! Document ids stored either as ObjectIds or as plain strings.
//!
//! Invoices written by the storefront's earlier backend carry ObjectId `_id`s
//! on the invoice and on every cart line. Ids minted here are UUID strings.
//! Both surface as `String` in the models, ObjectIds as their 24-char hex.

use mongodb::bson::{oid::ObjectId, Bson};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// The BSON value an id is stored as.
pub fn id_bson(id: &str) -> Bson {
    match ObjectId::parse_str(id) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(id.to_string()),
    }
}

pub fn serialize<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    id_bson(id).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Bson::deserialize(deserializer)? {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(id) => Ok(id),
        other => Err(de::Error::custom(format!(
            "unsupported document id {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_ids_are_stored_as_object_ids() {
        let oid = ObjectId::new();
        assert_eq!(id_bson(&oid.to_hex()), Bson::ObjectId(oid));

        let uuid = uuid::Uuid::new_v4().to_string();
        assert_eq!(id_bson(&uuid), Bson::String(uuid.clone()));
    }
}
