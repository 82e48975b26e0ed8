/*!
# FloorMap DevKit - Fakes et utilitaires de test

Bibliothèque facilitant les tests du migrateur avec:
- Fakes Catalyst Center / Meraki en mémoire
- Construction d'archives de cartes (tar.gz)
- Harness bout-en-bout avec entrées opérateur scriptées
*/

pub mod archive_builder;
pub mod fakes;
pub mod test_utils;

pub use archive_builder::MapArchiveBuilder;
pub use fakes::{FakeCatalystCenter, FakeMeraki};
pub use test_utils::{RunOutcome, TestHarness};
