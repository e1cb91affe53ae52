//! Text prompts used to request artwork for each subject.

use crate::assets::key::{ProcessType, ProductType, Subject};

/// Prompt sent to the image generator for `subject`.
#[must_use]
pub fn prompt(subject: Subject) -> &'static str {
    match subject {
        Subject::Process(ProcessType::Stamping) => {
            "Isometric view of a futuristic industrial stamping press machine, heavy steel construction, \
             metallic grey with safety yellow accents, dark background, high fidelity 3d render, \
             cinematic lighting, game asset style"
        }
        Subject::Process(ProcessType::Molding) => {
            "Isometric view of a high-tech injection molding machine, complex industrial machinery, \
             white and blue color scheme, dark background, 3d render, unreal engine 5 style"
        }
        Subject::Process(ProcessType::Plating) => {
            "Isometric view of an industrial chemical plating tank system, modular manufacturing equipment, \
             stainless steel and glass, dark background, 3d render"
        }
        Subject::Process(ProcessType::Assembly) => {
            "Isometric view of an orange industrial robotic arm on a mounting base, high tech automation \
             equipment, dark background, 3d render, sharp focus"
        }
        Subject::Product(ProductType::HvConnectorHsg) => {
            "Isometric view of an orange high-voltage EV connector housing, automotive plastic component, \
             technical product visualization, dark background, macro photography style"
        }
        Subject::Product(ProductType::BusbarClip) => {
            "Isometric view of a copper electrical busbar clip, shiny metallic texture, automotive \
             electrical component, dark background, 3d render"
        }
        Subject::Product(ProductType::SensorTerminal) => {
            "Isometric view of a gold-plated electrical sensor terminal, tiny intricate metal component, \
             dark background, macro 3d render"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subject_has_an_isometric_prompt() {
        for subject in Subject::ALL {
            let p = prompt(subject);
            assert!(p.starts_with("Isometric view"), "{subject:?}");
            assert!(p.contains("dark background"), "{subject:?}");
        }
    }

    #[test]
    fn prompts_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for subject in Subject::ALL {
            assert!(seen.insert(prompt(subject)));
        }
    }
}
