fn main() {
    let x = 10;
    let y = 20;
    let sum = x + y;
    println!("Hello from Rust! Sum is {}", sum);
}
