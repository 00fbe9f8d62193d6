use cucumber::World;
use cucumber_tests::features::world::SecurityWorld;

#[tokio::main]
async fn main() {
    SecurityWorld::cucumber().run_and_exit("features/").await;
}
