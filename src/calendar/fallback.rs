//! Demonstration week exported when no live events were received

use super::event::{CalendarEvent, WeekDay};

/// A student's typical week, used when a session produced no events.
pub fn fallback_week() -> Vec<CalendarEvent> {
    use WeekDay::{Friday, Monday, Saturday, Sunday, Thursday, Tuesday, Wednesday};

    let entry = |title: &str, day: WeekDay, start: f64, minutes: u32, description: &str| {
        CalendarEvent::new(title, day, start, minutes).with_description(description)
    };

    vec![
        entry("Cours Maths", Monday, 8.0, 120, "Algèbre linéaire - Amphi A"),
        entry("TD Physique", Monday, 10.0, 90, "Travaux dirigés de mécanique quantique"),
        entry("Déjeuner RU", Monday, 12.0, 60, "Restaurant universitaire"),
        entry("Cours Informatique", Monday, 14.0, 180, "Programmation orientée objet en Python"),
        entry("Cours Anglais", Tuesday, 9.0, 90, "Anglais technique niveau B2"),
        entry("Projet Groupe", Tuesday, 14.0, 120, "Travail en équipe sur le projet de semestre"),
        entry("Soirée BDE", Tuesday, 21.0, 180, "Soirée organisée par le Bureau des Étudiants"),
        entry("TD Maths", Wednesday, 8.0, 120, "Exercices sur les matrices et vecteurs propres"),
        entry("Cours Économie", Wednesday, 10.0, 120, "Introduction à la microéconomie"),
        entry("Cours Physique", Thursday, 8.0, 120, "Électromagnétisme - cours magistral"),
        entry("TP Informatique", Thursday, 10.0, 180, "Travaux pratiques - bases de données SQL"),
        entry("Réunion Asso", Thursday, 18.0, 90, "Réunion hebdomadaire de l'association sportive"),
        entry("Cours Marketing", Friday, 9.0, 120, "Stratégies marketing digital"),
        entry("TD Économie", Friday, 14.0, 90, "Exercices sur l'offre et la demande"),
        entry("Soirée Appart", Friday, 20.0, 240, "Soirée détente avec les colocs"),
        entry("Grasse matinée", Saturday, 7.0, 180, "Repos bien mérité !"),
        entry("Repas Famille", Sunday, 12.0, 120, "Déjeuner dominical en famille"),
        entry("Révisions", Sunday, 14.0, 180, "Préparation des examens de la semaine"),
    ]
}
