use crate::linear_algebra::Value;

pub fn sigmoid(x: Value) -> Value {
    1.0 / (1.0 + (-x).exp())
}

pub fn sigmoid_prime(x: Value) -> Value {
    let x_sigmoid = sigmoid(x);
    x_sigmoid * (1.0 - x_sigmoid)
}
