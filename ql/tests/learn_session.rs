use anyhow::Result;
use tempfile::tempdir;

use ql::learn::{EpisodeHistory, Parameter, QLearningAgent, Trainer, Transition};
use ql::prelude::{FlapAction, Observation, QlError};
use ql::state::{StateKey, StateSpace};
use ql::value_store::{MissPolicy, ValueStore};

#[test]
fn test_three_state_chain_gets_terminal_penalty() -> Result<()> {
    let dir = tempdir()?;
    let file = dir.path().join("qvalues.json");
    let space = StateSpace::new(10, 0..=20, 0..=0, 0..=0)?;
    let (a, b, c) = (StateKey::new(20, 0, 0), StateKey::new(10, 0, 0), StateKey::new(0, 0, 0));
    let mut store = ValueStore::seeded(&file, &space, MissPolicy::FailClosed);
    store.seed([StateKey::new(500, 280, 0)]);

    let mut history: EpisodeHistory = [
        Transition::new(a, FlapAction::NoFlap, b),
        Transition::new(b, FlapAction::Flap, c),
    ]
        .into_iter()
        .collect();
    let mut trainer = Trainer::new(Parameter::default());
    trainer.update(&mut history, &mut store, false)?;

    assert!(store.value(&a, FlapAction::NoFlap)? < -500.0);
    assert!(store.value(&b, FlapAction::Flap)? < -500.0);
    assert_eq!(store.get(&c)?, [0.0, 0.0]);
    assert_eq!(store.get(&StateKey::new(500, 280, 0))?, [0.0, 0.0]);
    Ok(())
}

#[test]
fn test_learned_values_survive_a_restart() -> Result<()> {
    let dir = tempdir()?;
    let file = dir.path().join("data").join("qvalues.json");
    let space = StateSpace::default();

    let first_run_values = {
        let store = ValueStore::seeded(&file, &space, MissPolicy::FailClosed);
        let mut agent = QLearningAgent::new(store, &space, Parameter::default());
        for x in [480.0, 470.0, 460.0, 450.0] {
            agent.act(&Observation::new(x, 150.0, 2))?;
        }
        agent.finish_episode()?;
        agent.shutdown()?;
        agent.store().get(&StateKey::new(460, 150, 2))?
    };
    assert_eq!(first_run_values, [-700.0, 0.0]);

    let store = ValueStore::load(&file, MissPolicy::FailClosed);
    assert_eq!(store.len(), space.len());
    assert_eq!(store.get(&StateKey::new(460, 150, 2))?, first_run_values);

    // the reloaded values drive the next run's decisions
    let mut agent = QLearningAgent::new(store, &space, Parameter::default());
    assert_eq!(agent.act(&Observation::new(465.0, 155.0, 2))?, FlapAction::Flap);
    Ok(())
}

#[test]
fn test_fail_closed_outside_state_space() -> Result<()> {
    let dir = tempdir()?;
    let space = StateSpace::default();
    let store = ValueStore::seeded(&dir.path().join("qvalues.json"), &space, MissPolicy::FailClosed);
    let mut agent = QLearningAgent::new(store, &space, Parameter::default());

    let err = agent.act(&Observation::new(900.0, 0.0, 0)).unwrap_err();
    match err.downcast_ref::<QlError>() {
        Some(QlError::UnknownState(key)) => assert_eq!(*key, StateKey::new(900, 0, 0)),
        other => panic!("unexpected error {:?}", other),
    }
    Ok(())
}
