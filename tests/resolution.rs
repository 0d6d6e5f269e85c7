/// Resolution algorithm integration tests
///
/// Covers the unsatisfied and ambiguous outcomes, the preference for
/// ordinary beans over alternatives, and the priority tie-break among
/// alternatives.
use std::sync::Arc;

use odi::{Annotation, BeanCollection, OdiError};

trait Mailer: Send + Sync {
    fn label(&self) -> &'static str;
}

struct Smtp;
impl Mailer for Smtp {
    fn label(&self) -> &'static str {
        "smtp"
    }
}

struct Sendgrid;
impl Mailer for Sendgrid {
    fn label(&self) -> &'static str {
        "sendgrid"
    }
}

struct MockMailer;
impl Mailer for MockMailer {
    fn label(&self) -> &'static str {
        "mock"
    }
}

#[test]
fn unsatisfied_when_nothing_provides_the_type() {
    let container = BeanCollection::new().build();
    let instance = container.select::<dyn Mailer>();
    assert!(instance.is_unsatisfied());
    assert!(matches!(
        instance.get(),
        Err(OdiError::Unsatisfied(_))
    ));
}

#[test]
fn sole_candidate_wins_without_qualifier_checks() {
    // A single type-compatible candidate resolves even when the request
    // carries qualifiers the bean never declared.
    let mut beans = BeanCollection::new();
    beans
        .register::<Smtp>()
        .singleton()
        .qualified(Annotation::qualifier("External"))
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Smtp)
        .done()
        .unwrap();
    let container = beans.build();

    let mailer = container
        .select_with::<dyn Mailer>([Annotation::qualifier("Internal")])
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(mailer.label(), "smtp");
}

#[test]
fn ordinary_bean_beats_the_alternative() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Smtp>()
        .singleton()
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Smtp)
        .done()
        .unwrap();
    beans
        .register::<MockMailer>()
        .singleton()
        .alternative()
        .priority(1000)
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| MockMailer)
        .done()
        .unwrap();
    let container = beans.build();

    // Priority never lets an alternative displace a matching ordinary bean.
    let mailer = container.select::<dyn Mailer>().get().unwrap();
    assert_eq!(mailer.label(), "smtp");
}

#[test]
fn alternative_wins_when_no_ordinary_bean_matches_the_qualifiers() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Smtp>()
        .singleton()
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Smtp)
        .done()
        .unwrap();
    beans
        .register::<MockMailer>()
        .singleton()
        .alternative()
        .qualified(Annotation::qualifier("Offline"))
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| MockMailer)
        .done()
        .unwrap();
    let container = beans.build();

    // The ordinary bean fails the qualifier filter, so the alternative is
    // the only survivor.
    let mailer = container
        .select_with::<dyn Mailer>([Annotation::qualifier("Offline")])
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(mailer.label(), "mock");
}

#[test]
fn qualified_alternatives_tie_break_past_a_default_ordinary_bean() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Smtp>()
        .singleton()
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Smtp)
        .done()
        .unwrap();
    beans
        .register::<MockMailer>()
        .singleton()
        .alternative()
        .priority(10)
        .qualified(Annotation::qualifier("Offline"))
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| MockMailer)
        .done()
        .unwrap();
    beans
        .register::<Sendgrid>()
        .singleton()
        .alternative()
        .priority(20)
        .qualified(Annotation::qualifier("Offline"))
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Sendgrid)
        .done()
        .unwrap();
    let container = beans.build();

    // The default-qualified ordinary bean never enters the qualified pool;
    // the higher-priority alternative takes it.
    let mailer = container
        .select_with::<dyn Mailer>([Annotation::qualifier("Offline")])
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(mailer.label(), "sendgrid");
}

fn two_alternatives(smtp_priority: i32, sendgrid_priority: i32) -> odi::OdiContainer {
    let mut beans = BeanCollection::new();
    beans
        .register::<Smtp>()
        .singleton()
        .alternative()
        .priority(smtp_priority)
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Smtp)
        .done()
        .unwrap();
    beans
        .register::<Sendgrid>()
        .singleton()
        .alternative()
        .priority(sendgrid_priority)
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Sendgrid)
        .done()
        .unwrap();
    beans.build()
}

#[test]
fn highest_priority_alternative_wins() {
    let container = two_alternatives(10, 20);
    let mailer = container.select::<dyn Mailer>().get().unwrap();
    assert_eq!(mailer.label(), "sendgrid");

    let container = two_alternatives(20, 10);
    let mailer = container.select::<dyn Mailer>().get().unwrap();
    assert_eq!(mailer.label(), "smtp");
}

#[test]
fn equal_priority_alternatives_are_ambiguous() {
    let container = two_alternatives(10, 10);
    let instance = container.select::<dyn Mailer>();
    assert!(instance.is_ambiguous());
    match instance.get() {
        Err(OdiError::Ambiguous(_, winners)) => {
            assert_eq!(winners.len(), 2);
            assert!(winners.iter().all(|w| w.contains("alternative")));
        }
        other => panic!("expected ambiguity, got {:?}", other.map(|m| m.label())),
    }
}

#[test]
fn priority_breaks_ties_among_ordinary_beans_too() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Smtp>()
        .singleton()
        .priority(50)
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Smtp)
        .done()
        .unwrap();
    beans
        .register::<Sendgrid>()
        .singleton()
        .priority(10)
        .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
        .with(|_| Sendgrid)
        .done()
        .unwrap();
    let container = beans.build();

    let mailer = container.select::<dyn Mailer>().get().unwrap();
    assert_eq!(mailer.label(), "smtp");

    // Without a unique maximum both survive.
    let mut beans = BeanCollection::new();
    for _ in 0..2 {
        beans
            .register::<Smtp>()
            .singleton()
            .priority(50)
            .provides::<dyn Mailer>(|m| m as Arc<dyn Mailer>)
            .with(|_| Smtp)
            .done()
            .unwrap();
    }
    assert!(beans.build().select::<dyn Mailer>().is_ambiguous());
}

#[test]
fn bean_container_surface_resolves_a_filtered_set() {
    let container = two_alternatives(1, 2);

    let beans = container.get_beans::<dyn Mailer>([]).unwrap();
    assert_eq!(beans.len(), 2);

    let winner = container.resolve(beans).unwrap();
    assert_eq!(winner.priority(), 2);
    assert!(winner.is_alternative());

    assert!(matches!(
        container.resolve(Vec::new()),
        Err(OdiError::Unsatisfied(_))
    ));
}
