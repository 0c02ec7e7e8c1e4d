use anyhow::Context;
use clap::{Arg, Command};
use rand::{rngs::StdRng, SeedableRng};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::{collections::BTreeMap, path::Path};

use loot_data::{
    BonusListId, ConditionId, DungeonEncounterId, ItemContext, ItemData, ItemDatabase, ItemId,
    LootModeFlags, LootStoreType, LootTemplateId, QuestId, SkillId, SpellId,
};
use loot_game_common::{
    components::{InventoryError, Money, PlayerId, Team},
    messages::{LootId, LootType, WorldObjectId},
};
use loot_server::game::{
    components::{GameClient, Loot, LootItem},
    resources::{JsonLootDatabase, LootConfig, LootLoadReport, LootStorage},
    CriteriaEvent, LootPlayer, LootWorld, StoreDestination,
};

const SIMULATED_PLAYER: PlayerId = PlayerId(1);

struct SimulatedPlayer {
    team: Team,
    on_all_quests: bool,
}

impl LootPlayer for SimulatedPlayer {
    fn id(&self) -> PlayerId {
        SIMULATED_PLAYER
    }

    fn team(&self) -> Team {
        self.team
    }

    fn has_quest_for_item(&self, _item_id: ItemId) -> bool {
        self.on_all_quests
    }

    fn has_started_quest(&self, _quest_id: QuestId) -> bool {
        false
    }

    fn has_skill(&self, _skill_id: SkillId) -> bool {
        false
    }

    fn skill_value(&self, _skill_id: SkillId) -> u16 {
        0
    }

    fn has_spell(&self, _spell_id: SpellId) -> bool {
        false
    }

    fn can_use_by_specialization(&self, _item: &ItemData) -> bool {
        true
    }

    fn can_roll_need_for_item(&self, _item: &ItemData) -> bool {
        true
    }

    fn pass_on_group_loot(&self) -> bool {
        false
    }

    fn is_locked_to_dungeon_encounter(&self, _dungeon_encounter_id: DungeonEncounterId) -> bool {
        false
    }
}

/// A world containing only the simulated player, every condition passes.
struct SimulationWorld {
    items: ItemDatabase,
    player: SimulatedPlayer,
}

impl LootWorld for SimulationWorld {
    fn item_database(&self) -> &ItemDatabase {
        &self.items
    }

    fn player(&self, player_id: PlayerId) -> Option<&dyn LootPlayer> {
        if player_id == SIMULATED_PLAYER {
            Some(&self.player as &dyn LootPlayer)
        } else {
            None
        }
    }

    fn game_client(&self, _player_id: PlayerId) -> Option<&GameClient> {
        None
    }

    fn conditions_met(&self, _player: &dyn LootPlayer, _conditions: &[ConditionId]) -> bool {
        true
    }

    fn bonus_lists_for_item(&self, _item_id: ItemId, _context: ItemContext) -> Vec<BonusListId> {
        Vec::new()
    }

    fn try_store_new_item(
        &mut self,
        _player_id: PlayerId,
        _destination: StoreDestination,
        _item: &LootItem,
    ) -> Result<(), InventoryError> {
        Ok(())
    }

    fn try_add_money(&mut self, _player_id: PlayerId, _money: Money) -> Result<(), InventoryError> {
        Ok(())
    }

    fn send_item_retrieval_mail(&mut self, _player_id: PlayerId, _item: &LootItem) {}

    fn update_criteria(&mut self, _player_id: PlayerId, _event: CriteriaEvent) {}
}

fn load_item_database(path: &Path) -> Result<ItemDatabase, anyhow::Error> {
    let str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {}", path.to_string_lossy()))?;
    let items: Vec<ItemData> = serde_json::from_str(&str).with_context(|| {
        format!(
            "Failed to deserialise item list from file {}",
            path.to_string_lossy()
        )
    })?;
    Ok(ItemDatabase::new(items))
}

fn loot_type_for(store_type: LootStoreType) -> LootType {
    match store_type {
        LootStoreType::Creature => LootType::Corpse,
        LootStoreType::Disenchant => LootType::Disenchanting,
        LootStoreType::Fishing => LootType::Fishing,
        LootStoreType::Item => LootType::Item,
        LootStoreType::Milling => LootType::Milling,
        LootStoreType::Pickpocketing => LootType::Pickpocketing,
        LootStoreType::Prospecting => LootType::Prospecting,
        LootStoreType::Skinning => LootType::Skinning,
        _ => LootType::None,
    }
}

fn print_report(report: &LootLoadReport) {
    for (store_type, rows) in report.loaded_rows.iter() {
        if *rows > 0 {
            println!("{:<32} {:>8} rows", store_type.table_name(), rows);
        }
    }

    println!(
        "{} errors, {} warnings, {} unused reference templates",
        report.errors.len(),
        report.warnings.len(),
        report.unused_references.len()
    );
}

struct Simulation {
    store_type: LootStoreType,
    template_id: LootTemplateId,
    loot_mode: LootModeFlags,
    count: u32,
    seed: u64,
}

fn simulate(
    storage: &LootStorage,
    world: &SimulationWorld,
    simulation: &Simulation,
) -> Result<(), anyhow::Error> {
    if !storage
        .store(simulation.store_type)
        .have_loot_for(simulation.template_id)
    {
        anyhow::bail!(
            "Table '{}' has no loot template {}",
            simulation.store_type.table_name(),
            simulation.template_id
        );
    }

    let mut rng = StdRng::seed_from_u64(simulation.seed);
    let mut drops: BTreeMap<ItemId, (u32, u64)> = BTreeMap::new();
    let mut empty_loots = 0;

    for index in 0..simulation.count {
        let mut loot = Loot::new(
            LootId(index as u64),
            WorldObjectId(0),
            loot_type_for(simulation.store_type),
            None,
        );
        loot.fill_loot(
            simulation.template_id,
            simulation.store_type,
            storage,
            world,
            SIMULATED_PLAYER,
            None,
            true,
            false,
            simulation.loot_mode,
            &mut rng,
        );

        if loot.items.is_empty() {
            empty_loots += 1;
        }

        for item in loot.items.iter() {
            let (stacks, total) = drops.entry(item.item_id).or_default();
            *stacks += 1;
            *total += item.count as u64;
        }
    }

    println!(
        "Simulated {} loots from {} entry {} (seed {})",
        simulation.count,
        simulation.store_type.table_name(),
        simulation.template_id,
        simulation.seed
    );
    for (item_id, (stacks, total)) in drops.iter() {
        let name = world
            .items
            .get_item(*item_id)
            .map_or("", |item_data| item_data.name.as_str());
        println!(
            "{:>8} {:<32} {:>8.3}% {:>8.2} per drop",
            item_id.get(),
            name,
            *stacks as f64 * 100.0 / simulation.count as f64,
            *total as f64 / *stacks as f64
        );
    }
    println!(
        "{:>8} {:<32} {:>8.3}%",
        "-",
        "(nothing)",
        empty_loots as f64 * 100.0 / simulation.count as f64
    );

    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let command = Command::new("loot-check")
        .about("Validates loot tables and simulates drops")
        .arg(
            Arg::new("tables")
                .long("tables")
                .help("Directory containing one <table>.json file per loot table, defaults to 'loot'.")
                .takes_value(true),
        )
        .arg(
            Arg::new("items")
                .long("items")
                .help("JSON file with the item definitions referenced by the loot tables.")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON loot configuration, defaults to the built in rates.")
                .takes_value(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Also log informational messages while loading."),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .help("Loot template id to simulate drops from.")
                .takes_value(true),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .help("Loot table of the simulated template, defaults to 'creature'.")
                .takes_value(true),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .help("Number of loots to simulate, defaults to 10000.")
                .takes_value(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Random seed of the simulation, defaults to 0.")
                .takes_value(true),
        )
        .arg(
            Arg::new("loot-mode")
                .long("loot-mode")
                .help("Loot mode bits of the simulation, defaults to 1.")
                .takes_value(true),
        )
        .arg(
            Arg::new("team")
                .long("team")
                .help("Faction of the simulated player.")
                .takes_value(true)
                .value_parser(["alliance", "horde"]),
        )
        .arg(
            Arg::new("all-quests")
                .long("all-quests")
                .help("Simulate a player who is on every quest."),
        );
    let matches = command.get_matches();

    let log_level = if matches.is_present("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        log_level,
        ConfigBuilder::new().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let items_path = Path::new(matches.value_of("items").unwrap_or("items.json"));
    let tables_path = Path::new(matches.value_of("tables").unwrap_or("loot"));
    let config = if let Some(config_path) = matches.value_of("config") {
        LootConfig::load(Path::new(config_path))?
    } else {
        LootConfig::default()
    };

    let item_database = load_item_database(items_path)?;
    log::info!("Loaded {} items", item_database.len());

    let mut database = JsonLootDatabase::new(tables_path);
    let (storage, report) = LootStorage::load(&mut database, &item_database, config)?;
    print_report(&report);

    if let Some(template_id) = matches.value_of("simulate") {
        let store_name = matches.value_of("store").unwrap_or("creature");
        let simulation = Simulation {
            store_type: LootStoreType::from_short_name(store_name)
                .with_context(|| format!("Unknown loot table '{}'", store_name))?,
            template_id: template_id
                .parse()
                .with_context(|| format!("Invalid loot template id '{}'", template_id))?,
            loot_mode: LootModeFlags::from_bits_truncate(
                matches
                    .value_of("loot-mode")
                    .unwrap_or("1")
                    .parse()
                    .context("Invalid --loot-mode")?,
            ),
            count: matches
                .value_of("count")
                .unwrap_or("10000")
                .parse()
                .context("Invalid --count")?,
            seed: matches
                .value_of("seed")
                .unwrap_or("0")
                .parse()
                .context("Invalid --seed")?,
        };

        let world = SimulationWorld {
            items: item_database,
            player: SimulatedPlayer {
                team: match matches.value_of("team") {
                    Some("horde") => Team::Horde,
                    _ => Team::Alliance,
                },
                on_all_quests: matches.is_present("all-quests"),
            },
        };
        simulate(&storage, &world, &simulation)?;
    }

    if !report.errors.is_empty() {
        anyhow::bail!("{} loot table errors", report.errors.len());
    }

    Ok(())
}
