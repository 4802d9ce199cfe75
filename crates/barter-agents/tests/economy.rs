use std::sync::Arc;
use std::time::Duration;

use barter_agents::{
    spawn_agent, AgentConfig, Directory, EconomicAgent, InMemoryDirectory, InProcBus, Mailbox,
    SessionPolicy, Transport,
};
use barter_ledger::StatusBoard;
use barter_types::{AgentId, Basket, GoodCatalog, GoodId};

const GRAIN: GoodId = GoodId(0);
const BREAD: GoodId = GoodId(1);

/// Agents wired to one bus, with messages routed by hand
struct Economy {
    catalog: GoodCatalog,
    bus: Arc<InProcBus>,
    agents: Vec<(EconomicAgent, Mailbox)>,
}

impl Economy {
    fn new() -> Self {
        Self {
            catalog: GoodCatalog::new(["GRAIN", "BREAD"]).unwrap(),
            bus: Arc::new(InProcBus::new()),
            agents: Vec::new(),
        }
    }

    fn join(&mut self, name: &str, args: &[i64], config: AgentConfig) {
        let id = AgentId::from(name);
        let mailbox = self.bus.register(id.clone());
        let transport: Arc<dyn Transport> = self.bus.clone();
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let catalog = self.catalog.clone();
        let agent = EconomicAgent::from_args(id, catalog, &args, transport, config).unwrap();
        self.agents.push((agent, mailbox));
    }

    fn agent(&mut self, name: &str) -> &mut EconomicAgent {
        self.agents
            .iter_mut()
            .map(|(agent, _)| agent)
            .find(|agent| agent.id().as_str() == name)
            .unwrap()
    }

    fn buy(&mut self, buyer: &str, sellers: &[&str]) {
        let sellers = sellers.iter().map(|name| AgentId::from(*name)).collect();
        self.agent(buyer).launch_negotiation(sellers);
    }

    /// Deliver queued messages until every mailbox is empty
    fn settle(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let mut progressed = false;
            for (agent, mailbox) in self.agents.iter_mut() {
                while let Ok(message) = mailbox.try_recv() {
                    agent.handle_message(message);
                    delivered += 1;
                    progressed = true;
                }
            }
            if !progressed {
                return delivered;
            }
        }
    }
}

/// Baker: 1 BREAD = 2 GRAIN, holding 5 GRAIN and no BREAD
const BAKER: [i64; 6] = [0, 1, 2, 0, 5, 0];
/// Farmer: 1 GRAIN = 1 BREAD, holding 3 GRAIN
const FARMER: [i64; 6] = [1, 0, 0, 1, 3, 0];

#[test]
fn test_payment_clamps_when_buyer_cannot_pay() {
    let mut economy = Economy::new();
    economy.join("baker", &BAKER, AgentConfig::default());
    economy.join("farmer", &FARMER, AgentConfig::default());

    economy.buy("baker", &["farmer"]);
    // cfp, propose, accept-proposal, inform
    assert_eq!(economy.settle(), 4);

    let baker = economy.agent("baker");
    assert_eq!(baker.outcomes().success, 1);
    // GRAIN 5 + 1 bought, BREAD 0 so nothing paid; then 3 cycles of baking
    assert_eq!(baker.ledger().holdings(), &Basket::from(vec![0, 3]));
    assert_eq!(baker.ledger().price_of(GRAIN), Basket::from(vec![0, 1]));

    let farmer = economy.agent("farmer");
    // credited the full price anyway, then turned the BREAD back into GRAIN
    assert_eq!(farmer.ledger().holdings(), &Basket::from(vec![3, 0]));
    assert_eq!(farmer.seller_stats().sales_completed, 1);
}

#[test]
fn test_cheapest_seller_is_chosen() {
    let mut economy = Economy::new();
    economy.join("baker", &[0, 1, 2, 0, 0, 9], AgentConfig::default());
    // 1 GRAIN = 3 BREAD
    economy.join("dear", &[1, 0, 0, 3, 2, 0], AgentConfig::default());
    economy.join("cheap", &FARMER, AgentConfig::default());

    economy.buy("baker", &["dear", "cheap"]);
    economy.settle();

    assert_eq!(economy.agent("baker").ledger().quantity(BREAD), 8);
    assert_eq!(economy.agent("cheap").seller_stats().sales_completed, 1);
    assert_eq!(economy.agent("dear").seller_stats().quotes_offered, 1);
    assert_eq!(economy.agent("dear").seller_stats().sales_completed, 0);
}

#[test]
fn test_last_unit_goes_to_one_buyer() {
    let mut economy = Economy::new();
    economy.join("baker", &[0, 1, 2, 0, 0, 4], AgentConfig::default());
    economy.join("miller", &[0, 1, 2, 0, 0, 4], AgentConfig::default());
    // one GRAIN given away for nothing, and no way to make more
    economy.join("farmer", &[0, 0, 0, 0, 1, 0], AgentConfig::default());

    economy.buy("baker", &["farmer"]);
    economy.buy("miller", &["farmer"]);
    economy.settle();

    let baker = economy.agent("baker").outcomes();
    let miller = economy.agent("miller").outcomes();
    assert_eq!(baker.success + miller.success, 1);
    assert_eq!(baker.race_lost + miller.race_lost, 1);

    let farmer = economy.agent("farmer");
    assert_eq!(farmer.seller_stats().sales_completed, 1);
    assert_eq!(farmer.seller_stats().sales_failed, 1);
}

#[test]
fn test_no_seller_sends_nothing() {
    let mut economy = Economy::new();
    economy.join("baker", &BAKER, AgentConfig::default());
    economy.join("farmer", &FARMER, AgentConfig::default());

    economy.buy("baker", &[]);

    assert_eq!(economy.settle(), 0);
    assert_eq!(economy.agent("baker").outcomes().no_seller, 1);
}

#[test]
fn test_overlapping_sessions_do_not_mix_replies() {
    let mut economy = Economy::new();
    economy.join("baker", &[0, 1, 2, 0, 0, 9], AgentConfig::default());
    economy.join("farmer", &[1, 0, 0, 1, 5, 0], AgentConfig::default());

    economy.buy("baker", &["farmer"]);
    economy.buy("baker", &["farmer"]);
    assert_eq!(economy.agent("baker").sessions().len(), 2);
    economy.settle();

    let baker = economy.agent("baker");
    assert_eq!(baker.outcomes().success, 2);
    assert!(baker.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_agents_trade_on_their_own() {
    let catalog = GoodCatalog::new(["GRAIN", "BREAD"]).unwrap();
    let bus = Arc::new(InProcBus::new());
    let directory: Arc<dyn Directory> = Arc::new(InMemoryDirectory::new());
    let board = StatusBoard::new(catalog.clone());
    let config = AgentConfig {
        session_timeout: Some(Duration::from_secs(10)),
        session_policy: SessionPolicy::Serialized,
        ..AgentConfig::default()
    };

    let mut handles = Vec::new();
    for (name, args) in [("baker", BAKER), ("farmer", FARMER)] {
        let id = AgentId::from(name);
        let mailbox = bus.register(id.clone());
        let transport: Arc<dyn Transport> = bus.clone();
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let mut agent =
            EconomicAgent::from_args(id, catalog.clone(), &args, transport, config.clone())
                .unwrap();
        agent.add_observer(Box::new(board.clone()));
        handles.push(spawn_agent(agent, mailbox, directory.clone()));
    }

    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(board.agents(), vec![AgentId::from("baker"), AgentId::from("farmer")]);

    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.stop().await.unwrap());
    }

    for report in &reports {
        assert_eq!(report.trade_cycles, 2);
        assert_eq!(report.outcomes.timeout, 0);
        assert!(report.outcomes.success >= 1, "{} never traded", report.agent);
    }
    assert_eq!(
        board.latest(&AgentId::from("baker")).unwrap().quantities,
        reports[0].holdings
    );
}
