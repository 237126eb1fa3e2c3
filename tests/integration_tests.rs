use anyhow::Result;
use kitchen_costing::*;

fn grid_from_csv(name: &str, text: &str) -> Result<SpreadsheetGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim().as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(SpreadsheetGrid::from_text_rows(name, rows))
}

const BEEF_STEW_CARD: &str = "
STANDARD RECIPE CARD,,,,,
NAME,Beef Stew,,,,
Portions,4,,,,
Sales Price,10.00,,,,
Code,Ingredient,Unit,Qty,Unit Cost,Total Cost
1001,Beef,kg,1,2.00,
1002,Carrot,kg,1,3.00,
,TOTAL,,,,5.00
";

const STOCK_LIST: &str = "
Item Code,Item Name,Unit,Price,Stock
Meat,,,,
1001,Beef Chuck,kg,2.00,10
Veg,,,,
1002,Carrot,kg,3.00,25
";

fn extract_beef_stew() -> Result<Vec<ExtractedRecipe>> {
    let workbook = Workbook::new(vec![grid_from_csv("Mains", BEEF_STEW_CARD)?]);
    Ok(extract_recipes(&workbook, &ExtractionOptions::default())?.items)
}

fn stock_list() -> Result<Vec<ExtractedInventoryItem>> {
    let workbook = Workbook::new(vec![grid_from_csv("Stock", STOCK_LIST)?]);
    Ok(extract_inventory(&workbook, &ExtractionOptions::default())?.items)
}

#[test]
fn test_end_to_end_recipe_costing() -> Result<()> {
    let recipes = extract_beef_stew()?;

    assert_eq!(recipes.len(), 1);
    let stew = &recipes[0];
    assert_eq!(stew.name, "Beef Stew");
    assert_eq!(stew.category, "Mains");
    assert_eq!(stew.ingredients.len(), 2);
    assert!((stew.total_cost - 5.0).abs() < 1e-9);
    assert!((stew.cost_percentage - 50.0).abs() < 1e-9);
    assert_eq!(stew.yield_amount, 4.0);
    assert_eq!(stew.yield_unit, "portions");
    assert!((stew.cost_per_portion() - 1.25).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_receipts_propagate_into_recipes() -> Result<()> {
    let recipes = extract_beef_stew()?;
    let inventory = stock_list()?;
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[0].category, "Meat");

    let receipts = vec![
        ReceiptItem::new("1001", "BEEF CHUCK", "kg", 2.50),
        ReceiptItem::new("", "carrot", "kg", 3.00),
        ReceiptItem::new("", "Saffron", "g", 12.0),
    ];
    let update = process_receipts(&recipes, &inventory, &receipts, &CostingConfig::default())?;

    let stew = &update.recipes[0];
    assert!((stew.total_cost - 5.5).abs() < 1e-9);
    assert!((stew.cost_percentage - 55.0).abs() < 1e-9);

    let summary = &update.summary;
    assert_eq!(summary.recipes_updated, 1);
    assert_eq!(summary.ingredients_updated, 1);
    assert_eq!(summary.receipts_matched, 2);
    assert_eq!(summary.unmatched_receipts, vec!["Saffron".to_string()]);
    assert!((summary.net_change() - 0.5).abs() < 1e-9);
    assert_eq!(summary.largest_increase().map(|c| c.ingredient_name.as_str()), Some("Beef"));

    // the input recipes are not modified
    assert!((recipes[0].total_cost - 5.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_propagation_is_idempotent() -> Result<()> {
    let recipes = extract_beef_stew()?;
    let inventory = stock_list()?;
    let receipts = vec![ReceiptItem::new("1001", "Beef Chuck", "kg", 2.50)];
    let config = CostingConfig::default();

    let first = process_receipts(&recipes, &inventory, &receipts, &config)?;
    let second = process_receipts(&first.recipes, &inventory, &receipts, &config)?;

    assert_eq!(first.summary.ingredients_updated, 1);
    assert_eq!(second.summary.ingredients_updated, 0);
    assert_eq!(second.recipes, first.recipes);
    assert_eq!(second.summary.total_cost_before, first.summary.total_cost_after);

    let no_prices = process_receipts(&first.recipes, &inventory, &[], &config)?;
    assert_eq!(no_prices.recipes, first.recipes);

    Ok(())
}

#[test]
fn test_olive_oil_matching() -> Result<()> {
    let inventory = vec![ExtractedInventoryItem {
        item_code: "A1".to_string(),
        name: "Olive Oil".to_string(),
        unit: "l".to_string(),
        ..Default::default()
    }];
    let receipts = vec![ReceiptItem::new("", "olive  oil", "l", 8.0)];

    let matched = match_receipts(&receipts, &inventory, 0.7)?;
    assert_eq!(matched.matches.len(), 1);
    assert_eq!(matched.matches[0].item_code, "A1");

    // the normalized names are identical, so only the top of the range rejects them
    let strict = match_receipts(&receipts, &inventory, 1.0)?;
    assert!(strict.matches.is_empty());

    assert!(matches!(
        match_receipts(&receipts, &inventory, 1.01),
        Err(CostingError::InvalidThreshold(_))
    ));

    Ok(())
}

#[test]
fn test_duplicate_recipe_keeps_first() -> Result<()> {
    let sheet = grid_from_csv(
        "Mains",
        "
NAME,Beef Stew,,,
Code,Ingredient,Unit,Qty,Unit Cost
1001,Beef,kg,1,2.00
NAME,BEEF  STEW,,,
Code,Ingredient,Unit,Qty,Unit Cost
1001,Beef,kg,1,9.00
",
    )?;
    let report = extract_recipes(&Workbook::new(vec![sheet]), &ExtractionOptions::default())?;

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].name, "Beef Stew");
    assert_eq!(report.items[0].total_cost, 2.0);
    assert_eq!(report.stats.duplicates_dropped, 1);

    Ok(())
}

#[test]
fn test_oversize_record_is_capped() -> Result<()> {
    let mut text = String::from("NAME,Long Soup,,,\nCode,Ingredient,Unit,Qty,Unit Cost\n");
    for i in 0..70 {
        text.push_str(&format!("{},Stock Item {},g,1,0.01\n", i, i));
    }
    text.push_str("NAME,Short Soup,,,\nCode,Ingredient,Unit,Qty,Unit Cost\n1,Salt,g,1,0.5\n");

    let sheet = grid_from_csv("Soups", &text)?;
    let report = extract_recipes(&Workbook::new(vec![sheet]), &ExtractionOptions::default())?;

    assert_eq!(report.items.len(), 2);
    // rows 2..50 of the 50-row window are ingredients
    assert_eq!(report.items[0].ingredients.len(), 48);
    assert_eq!(report.items[1].name, "Short Soup");
    assert_eq!(report.items[1].ingredients.len(), 1);

    Ok(())
}

#[test]
fn test_expected_names_drive_records() -> Result<()> {
    let sheet = grid_from_csv(
        "Kitchen",
        "
Beef Stew,,,,
Code,Ingredient,Unit,Qty,Unit Cost
1001,Beef,kg,1,2.00
,,,,
Fish Pie,,,,
Code,Ingredient,Unit,Qty,Unit Cost
2001,Cod,kg,0.5,14.00
",
    )?;
    let index = ExpectedNameIndex::from_json(
        r#"{
            "Beef Stew": {"category": "Mains", "found": false},
            "Fish Pie": {"category": "Seafood", "found": false},
            "Lemon Tart": {"category": "Desserts", "found": false}
        }"#,
    )?;
    let options = ExtractionOptions::default().with_expected(index);
    let report = extract_recipes(&Workbook::new(vec![sheet]), &options)?;

    let names: Vec<&str> = report.items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Beef Stew", "Fish Pie"]);
    assert_eq!(report.items[1].category, "Seafood");
    assert_eq!(report.items[1].total_cost, 7.0);

    let expected = report.expected.expect("index handed back");
    assert_eq!(expected.unfound_names(), vec!["Lemon Tart".to_string()]);

    Ok(())
}

#[test]
fn test_bad_sheets_do_not_stop_the_workbook() -> Result<()> {
    let workbook = Workbook::new(vec![
        grid_from_csv("Recipe Summary", BEEF_STEW_CARD)?,
        grid_from_csv("Notes", "remember to reorder,flour\n")?,
        grid_from_csv("Mains", BEEF_STEW_CARD)?,
    ]);
    let report = extract_recipes(&workbook, &ExtractionOptions::default())?;

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.stats.sheets_processed, 1);
    assert_eq!(report.stats.sheets_skipped, 2);

    let kinds: Vec<&WarningKind> = report.warnings.iter().map(|w| &w.kind).collect();
    assert_eq!(kinds, vec![&WarningKind::SkippedSheet, &WarningKind::NoMarkers]);

    assert!(matches!(
        extract_recipes(&Workbook::default(), &ExtractionOptions::default()),
        Err(CostingError::EmptyWorkbook)
    ));

    Ok(())
}

#[test]
fn test_gross_loss_convention_from_json() -> Result<()> {
    let config = ExtractionConfig::from_json(r#"{"loss_convention": "gross"}"#)?;
    let sheet = grid_from_csv(
        "Mains",
        "
NAME,Onion Soup,,,,
Code,Ingredient,Unit,Qty,Loss %,Unit Cost
3001,Onion,kg,2,10,1.00
",
    )?;
    let report = extract_recipes(&Workbook::new(vec![sheet]), &ExtractionOptions::new(config))?;

    let onion = &report.items[0].ingredients[0];
    assert!((onion.loss - 0.1).abs() < 1e-9);
    assert!((onion.net_qty - 2.2).abs() < 1e-9);
    assert!((report.items[0].total_cost - 2.2).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_verification_catches_inconsistent_totals() -> Result<()> {
    let mut recipes = extract_beef_stew()?;
    recipes[0].total_cost = 7.0;
    let inventory = stock_list()?;
    let config = CostingConfig::default();

    let result = process_receipts_with_verification(&recipes, &inventory, &[], &config, 0.01);
    assert!(matches!(
        result,
        Err(CostingError::RecipeTotalMismatch { ref recipe, .. }) if recipe == "Beef Stew"
    ));

    // a price change recomputes the total and restores the invariant
    let receipts = vec![ReceiptItem::new("1002", "Carrot", "kg", 3.50)];
    let update =
        process_receipts_with_verification(&recipes, &inventory, &receipts, &config, 0.01)?;
    assert!((update.recipes[0].total_cost - 5.5).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_overrides_then_report() -> Result<()> {
    let recipes = extract_beef_stew()?;
    let overrides = RecipeOverrides::from_json(
        r#"{"modifications": [
            {"action": "rename", "target": "beef stew", "new_name": "Braised Beef"},
            {"action": "set_sales_price", "target": "Braised Beef", "sales_price": 12.5}
        ]}"#,
    )?;
    let recipes = overrides.apply(&recipes);
    assert_eq!(recipes[0].name, "Braised Beef");
    assert!((recipes[0].cost_percentage - 40.0).abs() < 1e-9);

    let receipts = vec![ReceiptItem::new("1001", "Beef", "kg", 3.00)];
    let update = process_receipts(&recipes, &stock_list()?, &receipts, &CostingConfig::default())?;

    let markdown = update.summary.to_markdown();
    assert!(markdown.contains("| Braised Beef | Beef |"));
    assert!(update.summary.to_csv().contains("Braised Beef,Beef,1001"));

    Ok(())
}
