use cucumber::given;
use shop_common::Money;
use shop_engine::{
    db_types::{NewProduct, NewUser, Role},
    AccountManagement,
    CatalogManagement,
};

use crate::cucumber::{shop_world::ShopSystem, ShopWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ShopWorld) {
    let system = ShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a customer {word} with a balance of {word}")]
async fn customer_with_balance(world: &mut ShopWorld, email: String, balance: String) {
    let sys = world.system();
    let balance = balance.parse::<Money>().expect("Not a valid amount");
    let user = NewUser { email: email.clone(), password_hash: "-".to_string(), role: Role::Customer };
    let user = sys.db.create_user(user).await.expect("Error creating user");
    if balance.is_positive() {
        sys.db.top_up(user.user_id, balance).await.expect("Error topping up");
    }
    sys.users.insert(email, user.user_id);
}

#[given(expr = "a product {string} priced at {word} with {int} in stock")]
async fn product_in_stock(world: &mut ShopWorld, name: String, price: String, stock: i64) {
    let sys = world.system();
    let price = price.parse::<Money>().expect("Not a valid price");
    let id = sys.db.create_product(NewProduct::new(name.clone(), price, stock)).await.expect("Error creating product");
    sys.products.insert(name, id);
}
