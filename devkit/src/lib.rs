/*!
# DeckHub DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le test du kernel et des clients DeckHub avec:
- Executor mock (résultats scriptés, délais, appels enregistrés)
- Source de télémétrie scriptée
- Constructeurs de frames client
- Harness complet : coordinator + gateway + sondes, ou serveur réel sur port éphémère
*/

pub mod executor_stub;
pub mod frames;
pub mod test_utils;

pub use executor_stub::{MockExecutor, ScriptedMetricsSource};
pub use frames::FrameBuilder;
pub use test_utils::{Probe, TestHarness};
